use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

use crate::model::Session;

/// Handle for an auth-state subscription, returned by the provider so the core
/// can release it on teardown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

/// Short-lived bearer token. Kept only for the duration of one request; the
/// backing memory is wiped on drop and `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A JWT is three non-empty dot-separated segments. Anything else is
    /// rejected before it is sent.
    #[must_use]
    pub fn looks_like_jwt(&self) -> bool {
        let parts: Vec<&str> = self.0.split('.').collect();
        parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

impl Drop for BearerToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityOperation {
    /// Start delivering auth-state changes. The first answer carries the
    /// current user; later changes arrive as `SessionChanged` events pushed by
    /// the shell.
    Subscribe,
    Unsubscribe { subscription: SubscriptionId },
    MintToken { force_refresh: bool },
    SignIn,
    SignOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityOutput {
    Subscribed {
        subscription: SubscriptionId,
        current: Option<Session>,
    },
    Unsubscribed,
    Token(BearerToken),
    SignedIn(Session),
    SignedOut,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityError {
    #[error("no signed-in user")]
    NotSignedIn,

    #[error("sign-in was cancelled")]
    Cancelled,

    #[error("identity provider error: {message}")]
    Provider { message: String },

    #[error("unexpected provider response to {operation}")]
    UnexpectedOutput { operation: String },
}

pub type IdentityResult = Result<IdentityOutput, IdentityError>;

impl Operation for IdentityOperation {
    type Output = IdentityResult;
}

pub struct Identity<E> {
    context: CapabilityContext<IdentityOperation, E>,
}

impl<E> Clone for Identity<E> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<Ev> Capability<Ev> for Identity<Ev> {
    type Operation = IdentityOperation;
    type MappedSelf<MappedEv> = Identity<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Identity::new(self.context.map_event(f))
    }
}

impl<E> Identity<E>
where
    E: Send + 'static,
{
    #[must_use]
    pub fn new(context: CapabilityContext<IdentityOperation, E>) -> Self {
        Self { context }
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnOnce(Result<(SubscriptionId, Option<Session>), IdentityError>) -> E + Send + 'static,
    {
        self.request(IdentityOperation::Subscribe, move |result| {
            callback(result.and_then(|output| match output {
                IdentityOutput::Subscribed {
                    subscription,
                    current,
                } => Ok((subscription, current)),
                _ => Err(IdentityError::UnexpectedOutput {
                    operation: "subscribe".to_string(),
                }),
            }))
        });
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .notify_shell(IdentityOperation::Unsubscribe { subscription })
                .await;
        });
    }

    pub fn mint_token<F>(&self, force_refresh: bool, callback: F)
    where
        F: FnOnce(Result<BearerToken, IdentityError>) -> E + Send + 'static,
    {
        self.request(
            IdentityOperation::MintToken { force_refresh },
            move |result| {
                callback(result.and_then(|output| match output {
                    IdentityOutput::Token(token) => Ok(token),
                    _ => Err(IdentityError::UnexpectedOutput {
                        operation: "mint_token".to_string(),
                    }),
                }))
            },
        );
    }

    pub fn sign_in<F>(&self, callback: F)
    where
        F: FnOnce(Result<Session, IdentityError>) -> E + Send + 'static,
    {
        self.request(IdentityOperation::SignIn, move |result| {
            callback(result.and_then(|output| match output {
                IdentityOutput::SignedIn(session) => Ok(session),
                _ => Err(IdentityError::UnexpectedOutput {
                    operation: "sign_in".to_string(),
                }),
            }))
        });
    }

    pub fn sign_out<F>(&self, callback: F)
    where
        F: FnOnce(Result<(), IdentityError>) -> E + Send + 'static,
    {
        self.request(IdentityOperation::SignOut, move |result| {
            callback(result.and_then(|output| match output {
                IdentityOutput::SignedOut => Ok(()),
                _ => Err(IdentityError::UnexpectedOutput {
                    operation: "sign_out".to_string(),
                }),
            }))
        });
    }

    fn request<F>(&self, operation: IdentityOperation, callback: F)
    where
        F: FnOnce(IdentityResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = BearerToken::new("aaa.bbb.ccc");
        let debug = format!("{token:?}");
        assert!(!debug.contains("aaa"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn jwt_shape_check() {
        assert!(BearerToken::new("aaa.bbb.ccc").looks_like_jwt());
        assert!(!BearerToken::new("aaa.bbb").looks_like_jwt());
        assert!(!BearerToken::new("aaa..ccc").looks_like_jwt());
        assert!(!BearerToken::new("").looks_like_jwt());
        assert!(!BearerToken::new("a.b.c.d").looks_like_jwt());
    }

    #[test]
    fn token_serializes_as_plain_string() {
        let token: BearerToken = serde_json::from_str("\"aaa.bbb.ccc\"").unwrap();
        assert_eq!(token.expose(), "aaa.bbb.ccc");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"aaa.bbb.ccc\"");
    }
}
