use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Empty};
use hyper::body::Bytes;
use hyper::Response;

pub type RespBody = BoxBody<Bytes, hyper::Error>;

/// Response with `status_code` and no body, used for drops and forwarding failures
pub fn synthetic_response(status_code: StatusCode) -> Response<RespBody> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = status_code;
    resp
}

fn empty_body() -> RespBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}
