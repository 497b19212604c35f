use axum::response::Html;

/// The band dashboard. Data loads client-side from the JSON API.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
