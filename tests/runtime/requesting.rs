//! The Requesting concept as the engine sees it.

use concord_engine::ActionSignature;
use concord_foundation::{Record, record};
use concord_runtime::Requesting;

use crate::support::{add_item, fixture};

fn await_response() -> ActionSignature {
    Requesting::signature("_awaitResponse")
}

#[tokio::test]
async fn request_cascade_answers_itself() {
    let fx = fixture();
    let cascade = fx
        .engine
        .invoke(
            Requesting::signature("request"),
            record! { "path" => "/Catalog/add", "title" => "Dune" },
        )
        .await
        .unwrap();

    let id = cascade.output().get_str("request").unwrap();
    assert_eq!(cascade.count(&add_item()), 1);
    assert_eq!(cascade.count(&Requesting::signature("respond")), 1);
    assert_eq!(fx.requesting.response(id), Some(record! { "item" => "item-1" }));
    assert_eq!(fx.requesting.path(id).as_deref(), Some("/Catalog/add"));
}

#[tokio::test]
async fn await_response_is_empty_until_answered() {
    let fx = fixture();
    let cascade = fx
        .engine
        .invoke(Requesting::signature("request"), record! { "path" => "/Nowhere" })
        .await
        .unwrap();
    let id = cascade.output().get_str("request").unwrap();
    assert_eq!(cascade.records.len(), 1);

    let rows = fx
        .engine
        .query(&await_response(), record! { "request" => id })
        .await
        .unwrap();
    assert!(rows.is_empty());

    fx.engine
        .invoke(
            Requesting::signature("respond"),
            record! { "request" => id, "status" => 204 },
        )
        .await
        .unwrap();

    let rows = fx
        .engine
        .query(&await_response(), record! { "request" => id })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let response = Record::from_value(rows[0].get("response").unwrap()).unwrap();
    assert_eq!(response, record! { "status" => 204 });
}

#[tokio::test]
async fn bad_responds_are_domain_errors() {
    let fx = fixture();
    let unknown = fx
        .engine
        .invoke(Requesting::signature("respond"), record! { "request" => "req-9" })
        .await
        .unwrap();
    assert_eq!(unknown.output().error_message(), Some("unknown request: req-9"));

    let cascade = fx
        .engine
        .invoke(
            Requesting::signature("request"),
            record! { "path" => "/Catalog/add", "title" => "Dune" },
        )
        .await
        .unwrap();
    let id = cascade.output().get_str("request").unwrap();

    // The AddResponse rule already answered.
    let again = fx
        .engine
        .invoke(
            Requesting::signature("respond"),
            record! { "request" => id, "item" => "item-99" },
        )
        .await
        .unwrap();
    assert_eq!(
        again.output().error_message(),
        Some(format!("request {id} has already been answered").as_str())
    );
    assert_eq!(fx.requesting.response(id), Some(record! { "item" => "item-1" }));
}
