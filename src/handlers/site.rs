use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct IndexBody {
    pub title: &'static str,
    pub links: Vec<&'static str>,
}

pub async fn index() -> Json<IndexBody> {
    Json(IndexBody {
        title: "Welcome to Holiday Homes",
        links: vec!["/lettings", "/profiles"],
    })
}
