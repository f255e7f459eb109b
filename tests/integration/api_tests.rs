//! API integration tests
//!
//! Need a running server with a superuser `admin` / `admin`.

use chrono::{Duration, Local};
use reqwest::{redirect::Policy, Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080";

/// Helper to get an authenticated client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/api/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_rejects_bad_password() {
    let client = Client::new();

    let response = client
        .post(format!("{}/api/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "not-the-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_counts_visits() {
    let client = Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client");

    let first: Value = client
        .get(format!("{}/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(first["num_visits"], 0);

    let second: Value = client
        .get(format!("{}/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(second["num_visits"], 1);
    assert!(second["num_books"].is_i64());
}

#[tokio::test]
#[ignore]
async fn test_renewal_flow() {
    let client = Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("Failed to build client");
    let token = get_auth_token(&client).await;
    let today = Local::now().date_naive();

    let genre: Value = client
        .post(format!("{}/genres/", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": unique("Genre") }))
        .send()
        .await
        .expect("Failed to create genre")
        .json()
        .await
        .expect("Failed to parse genre");

    let author: Value = client
        .post(format!("{}/authors/", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "first_name": "Ursula", "last_name": unique("Le Guin") }))
        .send()
        .await
        .expect("Failed to create author")
        .json()
        .await
        .expect("Failed to parse author");

    let book: Value = client
        .post(format!("{}/books/", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": unique("The Dispossessed"),
            "author_id": author["id"],
            "summary": "An ambiguous utopia.",
            "isbn": "9780061054884",
            "genre_ids": [genre["id"]]
        }))
        .send()
        .await
        .expect("Failed to create book")
        .json()
        .await
        .expect("Failed to parse book");

    let me: Value = client
        .get(format!("{}/api/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get principal")
        .json()
        .await
        .expect("Failed to parse principal");

    let copy: Value = client
        .post(format!("{}/bookinstances/", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "book_id": book["id"],
            "imprint": "Harper, 1974",
            "status": "on_loan",
            "borrower_id": me["user_id"],
            "due_back": (today - Duration::days(1)).to_string()
        }))
        .send()
        .await
        .expect("Failed to create copy")
        .json()
        .await
        .expect("Failed to parse copy");
    let copy_id = copy["id"].as_str().expect("No copy id").to_string();

    // Pre-filled three weeks ahead
    let form: Value = client
        .get(format!("{}/book/{}/renew/", BASE_URL, copy_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get renewal form")
        .json()
        .await
        .expect("Failed to parse renewal form");
    assert_eq!(form["renewal_date"], (today + Duration::weeks(3)).to_string());
    assert_eq!(form["book_instance"]["is_overdue"], true);

    // More than four weeks ahead
    let rejected = client
        .post(format!("{}/book/{}/renew/", BASE_URL, copy_id))
        .bearer_auth(&token)
        .form(&[("renewal_date", (today + Duration::days(29)).to_string())])
        .send()
        .await
        .expect("Failed to post renewal");
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    let body: Value = rejected.json().await.expect("Failed to parse error");
    assert!(body["fields"]["renewal_date"].is_array());

    let renewed = client
        .post(format!("{}/book/{}/renew/", BASE_URL, copy_id))
        .bearer_auth(&token)
        .form(&[("renewal_date", (today + Duration::weeks(4)).to_string())])
        .send()
        .await
        .expect("Failed to post renewal");
    assert_eq!(renewed.status(), StatusCode::SEE_OTHER);
    assert_eq!(renewed.headers()["location"], "/");

    let copy: Value = client
        .get(format!("{}/bookinstances/{}/", BASE_URL, copy_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get copy")
        .json()
        .await
        .expect("Failed to parse copy");
    assert_eq!(copy["due_back"], (today + Duration::weeks(4)).to_string());
    assert_eq!(copy["is_overdue"], false);

    let mine: Value = client
        .get(format!("{}/mybooks/", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list my books")
        .json()
        .await
        .expect("Failed to parse my books");
    assert!(mine["items"]
        .as_array()
        .expect("No items")
        .iter()
        .any(|c| c["id"] == copy_id.as_str()));
}

#[tokio::test]
#[ignore]
async fn test_page_past_the_end_is_not_found() {
    let client = Client::new();

    let response = client
        .get(format!("{}/authors/?page=100000", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
