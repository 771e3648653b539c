use serde_json::json;

use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};

fn handle_image_encode(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(photos) = state.photos.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match photos.encode_stored(&name) {
        Ok(data_uri) => ok(&req.id, json!({ "image": data_uri })),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "image.encode" => Some(handle_image_encode(state, req)),
        _ => None,
    }
}
