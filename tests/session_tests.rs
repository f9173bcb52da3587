// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the AR session store

use serde_json::json;
use tryon::backends::{Camera, CameraHandle, Scene, SceneHandle};
use tryon::errors::SessionError;
use tryon::{ArSessionStore, Filter, FilterKind, SessionId};

fn ids(filters: &[Filter]) -> Vec<&str> {
    filters.iter().map(|f| f.id.as_str()).collect()
}

#[test]
fn test_filters_keep_insertion_order() {
    let store = ArSessionStore::new();
    let id = store.create();

    store.add_filter(&id, Filter::new("lips", FilterKind::Makeup)).unwrap();
    store.add_filter(&id, Filter::new("skin", FilterKind::Skin)).unwrap();
    store.add_filter(&id, Filter::new("hair", FilterKind::Hair)).unwrap();

    assert_eq!(ids(&store.filters(&id).unwrap()), ["lips", "skin", "hair"]);
}

#[test]
fn test_duplicate_filter_rejected() {
    let store = ArSessionStore::new();
    let id = store.create();
    store.add_filter(&id, Filter::new("lips", FilterKind::Makeup)).unwrap();

    let err = store
        .add_filter(&id, Filter::new("lips", FilterKind::Skin))
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::DuplicateFilter {
            session: id,
            filter: "lips".into()
        }
    );
    assert_eq!(store.filters(&id).unwrap().len(), 1);
}

#[test]
fn test_update_keeps_position() {
    let store = ArSessionStore::new();
    let id = store.create();
    store.add_filter(&id, Filter::new("lips", FilterKind::Makeup)).unwrap();
    store.add_filter(&id, Filter::new("skin", FilterKind::Skin)).unwrap();

    let updated = Filter::new("lips", FilterKind::Makeup)
        .with_setting("lipstick", json!({"color": "#aa0000"}));
    store.update_filter(&id, updated.clone()).unwrap();

    let filters = store.filters(&id).unwrap();
    assert_eq!(ids(&filters), ["lips", "skin"]);
    assert_eq!(filters[0], updated);

    assert!(matches!(
        store.update_filter(&id, Filter::new("brows", FilterKind::Makeup)),
        Err(SessionError::FilterNotFound { .. })
    ));
}

#[test]
fn test_remove_filter() {
    let store = ArSessionStore::new();
    let id = store.create();
    store.add_filter(&id, Filter::new("lips", FilterKind::Makeup)).unwrap();
    store.add_filter(&id, Filter::new("skin", FilterKind::Skin)).unwrap();

    let removed = store.remove_filter(&id, "lips").unwrap();
    assert_eq!(removed.kind, FilterKind::Makeup);
    assert_eq!(ids(&store.filters(&id).unwrap()), ["skin"]);
    assert!(store.remove_filter(&id, "lips").is_err());
}

#[test]
fn test_snapshot_and_listing() {
    let store = ArSessionStore::new();
    assert!(store.is_empty());

    let a = store.create();
    let b = store.create();
    assert_ne!(a, b);
    assert_eq!(store.len(), 2);

    let mut listed = store.list();
    listed.sort_by_key(|id| *id.as_uuid());
    let mut expected = vec![a, b];
    expected.sort_by_key(|id| *id.as_uuid());
    assert_eq!(listed, expected);

    let session = store.get(&a).unwrap();
    assert_eq!(session.id, a);
    assert!(session.filters.is_empty());
    assert!(session.render.last_frame.is_none());
    assert!(session.render.scene.is_none());
}

#[test]
fn test_session_id_round_trips_through_text() {
    let store = ArSessionStore::new();
    let id = store.create();

    let parsed: SessionId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
    assert!(store.contains(&parsed));
    assert!("not-a-session".parse::<SessionId>().is_err());
}

#[test]
fn test_end_disposes_render_context() {
    let store = ArSessionStore::new();
    let id = store.create();

    let scene = SceneHandle::new(Scene::new());
    let camera = CameraHandle::new(Camera::default());
    store
        .attach_render_context(&id, scene.clone(), camera.clone())
        .unwrap();
    assert!(store.get(&id).unwrap().render.context().usable().is_some());

    store.end(&id).unwrap();
    assert!(scene.is_disposed());
    assert!(camera.is_disposed());
    assert!(!store.contains(&id));
    assert_eq!(store.end(&id), Err(SessionError::NotFound(id)));
    assert_eq!(store.filters(&id), Err(SessionError::NotFound(id)));
}

#[test]
fn test_unknown_session() {
    let store = ArSessionStore::new();
    let other = ArSessionStore::new().create();

    assert!(store.get(&other).is_none());
    assert_eq!(
        store.add_filter(&other, Filter::new("lips", FilterKind::Makeup)),
        Err(SessionError::NotFound(other))
    );
    assert_eq!(store.last_frame(&other), Err(SessionError::NotFound(other)));
}
