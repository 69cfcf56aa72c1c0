#![cfg(feature = "web")]

use std::time::Duration;

use fleet_dashboard::error::FleetError;
use fleet_dashboard::login::{AccessRole, Authenticator, SessionStore};

#[test]
fn authenticator_maps_accounts_to_roles() {
    let auth = Authenticator::new(&[
        ("admin", "adminpass", AccessRole::Admin),
        ("viewer", "viewonly", AccessRole::Viewer),
    ])
    .unwrap();

    assert_eq!(auth.authenticate("admin", "adminpass").unwrap(), AccessRole::Admin);
    assert_eq!(auth.authenticate("viewer", "viewonly").unwrap(), AccessRole::Viewer);
    assert!(matches!(
        auth.authenticate("viewer", "adminpass"),
        Err(FleetError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.authenticate("nobody", "adminpass"),
        Err(FleetError::InvalidCredentials)
    ));
}

#[test]
fn sessions_validate_until_destroyed() {
    let sessions = SessionStore::new(Duration::from_secs(60));
    let session = sessions.create("viewer", AccessRole::Viewer);

    let found = sessions.validate(&session.id).unwrap();
    assert_eq!(found.username, "viewer");
    assert!(!found.is_admin());
    assert!(matches!(found.require_admin(), Err(FleetError::AccessDenied)));

    assert!(sessions.destroy(&session.id));
    assert!(!sessions.destroy(&session.id));
    assert!(sessions.validate(&session.id).is_none());
    assert!(sessions.is_empty());
}

#[test]
fn expired_sessions_are_dropped() {
    let sessions = SessionStore::new(Duration::ZERO);
    let session = sessions.create("admin", AccessRole::Admin);
    assert_eq!(sessions.len(), 1);

    assert!(sessions.validate(&session.id).is_none());
    assert!(sessions.is_empty());
}

#[test]
fn session_ids_are_unique() {
    let sessions = SessionStore::new(Duration::from_secs(60));
    let a = sessions.create("admin", AccessRole::Admin);
    let b = sessions.create("admin", AccessRole::Admin);
    assert_ne!(a.id, b.id);
    assert!(sessions.validate(&a.id).unwrap().is_admin());
    assert_eq!(sessions.len(), 2);
}
