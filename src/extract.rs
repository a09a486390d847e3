//! Axum extractor that maps an urlencoded form body onto a [`FromForm`] type.

use axum::async_trait;
use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::Error;
use crate::form::{populate, FormValues, FromForm};

/// Largest form body read, in bytes.
pub const MAX_FORM_BYTES: usize = 1024 * 1024;

/// `T` filled from the submitted form. Missing keys keep their default.
#[derive(Debug, Clone)]
pub struct FormStruct<T>(pub T);

#[derive(Debug)]
pub enum FormStructRejection {
    Body(String),
    Form(FormRejection),
    Populate(Error),
}

impl IntoResponse for FormStructRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Body(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Form(rejection) => rejection.into_response(),
            Self::Populate(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    }
}

/// Groups decoded pairs by key, keeping submission order per key.
pub fn group_pairs(pairs: Vec<(String, String)>) -> FormValues {
    let mut values = FormValues::new();
    for (key, value) in pairs {
        values.entry(key).or_default().push(value);
    }
    values
}

#[async_trait]
impl<S, T> FromRequest<S> for FormStruct<T>
where
    S: Send + Sync,
    T: FromForm + Default + Send,
{
    type Rejection = FormStructRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
            .await
            .map_err(|e| {
                warn!(error = %e, "could not read form body");
                FormStructRejection::Body(format!("could not read form body: {e}"))
            })?;
        let req = Request::from_parts(parts, Body::from(bytes));
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| {
                warn!(error = %e, "could not decode form");
                FormStructRejection::Form(e)
            })?;
        let mut target = T::default();
        populate(&mut target, &group_pairs(pairs), false, None)
            .map_err(FormStructRejection::Populate)?;
        Ok(FormStruct(target))
    }
}
