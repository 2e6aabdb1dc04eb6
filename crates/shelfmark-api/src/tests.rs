//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode},
};
use serde_json::{Value, json};
use shelfmark_core::{
  identity::{NewMember, Role},
  store::LibraryStore,
};
use shelfmark_store_sqlite::SqliteStore;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  api_router,
  identity::{SUBJECT_ID_HEADER, SUBJECT_ROLE_HEADER},
};

struct Harness {
  app:    Router,
  store:  SqliteStore,
  admin:  Uuid,
  member: Uuid,
}

async fn harness() -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let admin = Uuid::new_v4();
  let member = Uuid::new_v4();
  for (id, name, role) in [(admin, "desk", Role::Admin), (member, "alice", Role::Member)] {
    store
      .register_member(NewMember { member_id: id, username: name.into(), role })
      .await
      .unwrap();
  }
  Harness { app: api_router(Arc::new(store.clone())), store, admin, member }
}

fn request(method: &str, uri: &str, who: Option<(Uuid, &str)>, body: Option<Value>) -> Request<Body> {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some((id, role)) = who {
    builder = builder
      .header(SUBJECT_ID_HEADER, id.to_string())
      .header(SUBJECT_ROLE_HEADER, role);
  }
  match body {
    Some(v) => builder
      .header("content-type", "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, body)
}

impl Harness {
  async fn as_admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(&self.app, request(method, uri, Some((self.admin, "ADMIN")), body)).await
  }

  async fn as_member(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(&self.app, request(method, uri, Some((self.member, "MEMBER")), body)).await
  }

  async fn add_book(&self, title: &str, copies: u32) -> Value {
    let (status, body) = self
      .as_admin(
        "POST",
        "/books",
        Some(json!({
          "title": title,
          "author": "Frank Herbert",
          "isbn": format!("isbn-{title}"),
          "category": "Fiction",
          "total_copies": copies,
        })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
  }
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
  let h = harness().await;
  let (status, body) = send(&h.app, request("GET", "/books", None, None)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());

  let (status, _) =
    send(&h.app, request("GET", "/books", Some((h.member, "LIBRARIAN")), None)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_writes_need_an_admin() {
  let h = harness().await;
  let (status, _) = h
    .as_member(
      "POST",
      "/books",
      Some(json!({ "title": "Dune", "author": "F", "isbn": "1", "category": "SF" })),
    )
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let created = h.add_book("Dune", 2).await;
  assert_eq!(created["book"]["total_copies"], 2);
  assert_eq!(created["accession_numbers"], json!(["ACC00001", "ACC00002"]));

  // Same ISBN again: one more copy, reported as 200.
  let (status, again) = h
    .as_admin(
      "POST",
      "/books",
      Some(json!({ "title": "Dune", "author": "F", "isbn": "isbn-Dune", "category": "SF" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(again["existing"], true);
  assert_eq!(again["book"]["total_copies"], 3);
}

#[tokio::test]
async fn blank_fields_and_unknown_books() {
  let h = harness().await;
  let (status, _) = h
    .as_admin(
      "POST",
      "/books",
      Some(json!({ "title": "", "author": "F", "isbn": "1", "category": "SF" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h.as_member("GET", &format!("/books/{}", Uuid::new_v4()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shrinking_a_title_is_rejected() {
  let h = harness().await;
  let created = h.add_book("Dune", 2).await;
  let id = created["book"]["book_id"].as_str().unwrap();

  let (status, _) =
    h.as_admin("PATCH", &format!("/books/{id}"), Some(json!({ "total_copies": 1 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) =
    h.as_admin("PATCH", &format!("/books/{id}"), Some(json!({ "total_copies": 3 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["accession_numbers"], json!(["ACC00003"]));
}

#[tokio::test]
async fn request_and_approval_flow() {
  let h = harness().await;
  let created = h.add_book("Dune", 1).await;
  let book_id = created["book"]["book_id"].as_str().unwrap().to_owned();
  let (_, copies) = h.as_member("GET", &format!("/books/{book_id}/copies"), None).await;
  let copy_id = copies[0]["copy_id"].as_str().unwrap().to_owned();

  // Admins do not borrow.
  let (status, _) = h.as_admin("POST", "/requests", Some(json!({ "copy_id": copy_id }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, req) = h.as_member("POST", "/requests", Some(json!({ "copy_id": copy_id }))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(req["status"], "PENDING");
  let request_id = req["request_id"].as_str().unwrap().to_owned();

  let decision = format!("/requests/{request_id}/decision");
  let (status, _) = h.as_member("POST", &decision, Some(json!({ "status": "APPROVED" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = h.as_admin("POST", &decision, Some(json!({ "status": "MAYBE" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, decided) = h.as_admin("POST", &decision, Some(json!({ "status": "APPROVED" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decided["request"]["status"], "APPROVED");
  let borrow_id = decided["borrow"]["borrow_id"].as_str().unwrap().to_owned();

  let (status, _) = h.as_admin("POST", &decision, Some(json!({ "status": "REJECTED" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  let (status, _) = h.as_member("POST", "/requests", Some(json!({ "copy_id": copy_id }))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, loans) = h.as_member("GET", "/borrows?open_only=true", None).await;
  assert_eq!(loans.as_array().unwrap().len(), 1);
  assert_eq!(loans[0]["title"], "Dune");
  assert_eq!(loans[0]["stage"]["stage"], "on_loan");

  let (status, returned) = h.as_member("POST", &format!("/borrows/{borrow_id}/return"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(returned["book"]["available_copies"], 1);
}

#[tokio::test]
async fn members_only_see_their_own_requests() {
  let h = harness().await;
  let bob = Uuid::new_v4();
  h.store
    .register_member(NewMember { member_id: bob, username: "bob".into(), role: Role::Member })
    .await
    .unwrap();
  let created = h.add_book("Dune", 2).await;
  let book_id = created["book"]["book_id"].as_str().unwrap().to_owned();
  let (_, copies) = h.as_member("GET", &format!("/books/{book_id}/copies"), None).await;

  h.as_member("POST", "/requests", Some(json!({ "copy_id": copies[0]["copy_id"] }))).await;
  let (status, _) = send(
    &h.app,
    request("POST", "/requests", Some((bob, "MEMBER")), Some(json!({ "copy_id": copies[1]["copy_id"] }))),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, mine) = h.as_member("GET", &format!("/requests?member_id={bob}"), None).await;
  assert_eq!(mine.as_array().unwrap().len(), 1);
  assert_eq!(mine[0]["member_id"], h.member.to_string());

  let (_, all) = h.as_admin("GET", "/requests?status=PENDING", None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn desk_issue_return_and_watch() {
  let h = harness().await;
  let created = h.add_book("Dune", 1).await;
  let book_id = created["book"]["book_id"].as_str().unwrap().to_owned();
  let desk = json!({ "member_id": h.member, "accession_no": "ACC00001" });

  let (status, _) = h.as_member("POST", "/desk/issue", Some(desk.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, issued) = h.as_admin("POST", "/desk/issue", Some(desk.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(issued["request"]["admin_comment"], "Issued at the desk.");
  assert_eq!(issued["book"]["available_copies"], 0);

  let (status, _) = h.as_member("POST", &format!("/books/{book_id}/watch"), None).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = h.as_member("POST", &format!("/books/{book_id}/watch"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, returned) = h.as_admin("POST", "/desk/return", Some(desk.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(returned["notifications"], 1);
  let (status, _) = h.as_admin("POST", "/desk/return", Some(desk)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, inbox) = h.as_member("GET", "/notifications?unread_only=true", None).await;
  assert_eq!(inbox[0]["message"], "The book 'Dune' is now available.");
  let id = inbox[0]["notification_id"].as_str().unwrap().to_owned();

  let (status, note) = h.as_member("POST", &format!("/notifications/{id}/read"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(note["read"], true);
  let (_, inbox) = h.as_member("GET", "/notifications?unread_only=true", None).await;
  assert!(inbox.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn members_and_maintenance_are_admin_only() {
  let h = harness().await;
  let id = Uuid::new_v4();

  let (status, _) = h
    .as_member("PUT", &format!("/members/{id}"), Some(json!({ "username": "x", "role": "MEMBER" })))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, member) = h
    .as_admin("PUT", &format!("/members/{id}"), Some(json!({ "username": "carol", "role": "MEMBER" })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(member["role"], "MEMBER");
  let (_, members) = h.as_admin("GET", "/members", None).await;
  assert_eq!(members.as_array().unwrap().len(), 3);

  let (status, _) = h.as_member("POST", "/maintenance/fines", None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, report) = h.as_admin("POST", "/maintenance/fines", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["examined"], 0);
  let (status, notified) = h.as_admin("POST", "/maintenance/notifications", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(notified["notified"], 0);
}

#[tokio::test]
async fn deleting_books_and_copies() {
  let h = harness().await;
  let a = h.add_book("Dune", 2).await;
  let b = h.add_book("Emma", 1).await;
  let a_id = a["book"]["book_id"].as_str().unwrap().to_owned();

  let (_, copies) = h.as_admin("GET", &format!("/books/{a_id}/copies"), None).await;
  let copy_id = copies[0]["copy_id"].as_str().unwrap().to_owned();
  let (status, removed) = h.as_admin("DELETE", &format!("/copies/{copy_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(removed["total_copies"], 1);

  let (status, _) = h.as_admin("DELETE", &format!("/books/{a_id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = h
    .as_admin(
      "POST",
      "/books/bulk-delete",
      Some(json!({ "book_ids": [b["book"]["book_id"], Uuid::new_v4()] })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["deleted"], 1);

  let (_, books) = h.as_member("GET", "/books", None).await;
  assert!(books.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn copies_resolve_by_accession_number() {
  let h = harness().await;
  let book = h.add_book("Dune", 2).await;

  let (status, copy) = h.as_member("GET", "/accessions/ACC00002", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(copy["book_id"], book["book"]["book_id"]);

  let (status, _) = h.as_member("GET", "/accessions/ACC99999", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_copy_count_is_a_bad_request() {
  let h = harness().await;
  let book = h.add_book("Dune", 1).await;
  let id = book["book"]["book_id"].as_str().unwrap().to_owned();

  let (status, body) =
    h.as_admin("POST", &format!("/books/{id}/copies"), Some(json!({ "count": u32::MAX }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

  let (_, copies) = h.as_admin("GET", &format!("/books/{id}/copies"), None).await;
  assert_eq!(copies.as_array().unwrap().len(), 1);
}
