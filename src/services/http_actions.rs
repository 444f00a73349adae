use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ActionError, ActionResult},
    services::actions::{Announcer, RoleLookup, UserRole, VoteActions},
};

/// Chat backend reached over its REST API.
#[derive(Clone)]
pub struct HttpRoomActions {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteBody<'a> {
    user_uuid: &'a str,
    value: &'static str,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct RoleBody {
    role: UserRole,
}

impl HttpRoomActions {
    /// Build a client for the backend at `base_url`, optionally authenticating with a bearer token.
    pub fn new(base_url: &str, token: Option<String>) -> ActionResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| ActionError::transport("client setup", source))?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: token.map(Arc::from),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token.as_ref()),
            None => builder,
        }
    }

    fn vote(&self, room: &str, user: &str, value: &'static str) -> BoxFuture<'static, ActionResult<()>> {
        let action = if value == "like" { "upvote" } else { "downvote" };
        let request = self
            .request(Method::POST, &format!("rooms/{room}/votes"))
            .json(&VoteBody {
                user_uuid: user,
                value,
            });
        send(action, request).boxed()
    }
}

async fn send(action: &'static str, request: RequestBuilder) -> ActionResult<()> {
    let response = request
        .send()
        .await
        .map_err(|source| ActionError::transport(action, source))?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ActionError::Rejected {
            action,
            status: status.as_u16(),
        })
    }
}

impl VoteActions for HttpRoomActions {
    fn upvote(&self, room: &str, user: &str) -> BoxFuture<'static, ActionResult<()>> {
        self.vote(room, user, "like")
    }

    fn downvote(&self, room: &str, user: &str) -> BoxFuture<'static, ActionResult<()>> {
        self.vote(room, user, "dislike")
    }
}

impl Announcer for HttpRoomActions {
    fn announce(&self, room: &str, message: String) -> BoxFuture<'static, ActionResult<()>> {
        let request = self
            .request(Method::POST, &format!("rooms/{room}/messages"))
            .json(&MessageBody { message: &message });
        send("announce", request).boxed()
    }
}

impl RoleLookup for HttpRoomActions {
    fn role_of(&self, user: &str) -> BoxFuture<'static, ActionResult<UserRole>> {
        const ACTION: &str = "role lookup";
        let request = self.request(Method::GET, &format!("users/{user}/role"));
        async move {
            let response = request
                .send()
                .await
                .map_err(|source| ActionError::transport(ACTION, source))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ActionError::Rejected {
                    action: ACTION,
                    status: status.as_u16(),
                });
            }
            let body: RoleBody = response
                .json()
                .await
                .map_err(|source| ActionError::transport(ACTION, source))?;
            Ok(body.role)
        }
        .boxed()
    }
}
