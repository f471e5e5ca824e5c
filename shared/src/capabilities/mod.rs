mod identity;
mod multipart;
mod timer;

pub use self::identity::{
    BearerToken, Identity, IdentityError, IdentityOperation, IdentityOutput, IdentityResult,
    SubscriptionId,
};
pub use self::multipart::{
    FileHandle, FormPart, HttpHeaders, Multipart, MultipartError, MultipartOperation,
    MultipartRequest, MultipartResponse, MultipartResult, ValidatedUrl,
};
pub use self::timer::{Timer, TimerId, TimerOperation, TimerOutput};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

/// What `crux_http` hands back for a JSON call.
pub type ApiResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub multipart: Multipart<Event>,
    pub render: Render<Event>,
    pub identity: Identity<Event>,
    pub timer: Timer<Event>,
}
