// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The embedded single page served at /

use axum::response::Html;

const INDEX_HTML: &str = include_str!("page.html");

/// GET / - Serve the detection page
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
