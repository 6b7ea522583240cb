use chrono::{TimeZone, Utc};
use essence_core::db::open_db_in_memory;
use essence_core::{EventLogService, SqliteEventRepository, TrackerError, CSV_HEADER};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> EventLogService<SqliteEventRepository<'_>> {
    EventLogService::new(SqliteEventRepository::try_new(conn).unwrap())
}

fn event_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM events;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn export_of_empty_log_is_header_only() {
    let conn = open_db_in_memory().unwrap();
    let csv = service(&conn)
        .export_events_csv(Some("ada"), Uuid::new_v4())
        .unwrap();
    assert_eq!(csv, CSV_HEADER);
}

#[test]
fn export_keeps_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project_id = Uuid::new_v4();

    let later = Utc.with_ymd_and_hms(2013, 11, 4, 16, 0, 0).unwrap();
    let earlier = Utc.with_ymd_and_hms(2013, 11, 4, 9, 15, 30).unwrap();
    assert!(service
        .log_event_at(Some("ada"), project_id, "Team", "moved to Formed", later)
        .unwrap());
    assert!(service
        .log_event_at(Some("ada"), project_id, "board", "opened", earlier)
        .unwrap());

    let csv = service.export_events_csv(Some("ada"), project_id).unwrap();
    assert_eq!(
        csv,
        "WHEN,WHO,WHAT\n\
         \"2013-11-04T16:00:00.000Z\",\"Team\",\"moved to Formed\"\n\
         \"2013-11-04T09:15:30.000Z\",\"board\",\"opened\"\n"
    );
}

#[test]
fn log_event_stamps_current_time() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project_id = Uuid::new_v4();

    let before = Utc::now().timestamp_millis();
    assert!(service
        .log_event(Some("ada"), project_id, "Team", "moved")
        .unwrap());
    let after = Utc::now().timestamp_millis();

    let logged_at: i64 = conn
        .query_row("SELECT logged_at FROM events;", [], |row| row.get(0))
        .unwrap();
    assert!(logged_at >= before && logged_at <= after);
}

#[test]
fn missing_fields_are_rejected_without_writes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project_id = Uuid::new_v4();

    let err = service
        .log_event(Some("ada"), project_id, "", "moved")
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidArgument("who")));

    let err = service
        .log_event(Some("ada"), project_id, "Team", "")
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidArgument("what")));

    let err = service
        .log_event(Some("ada"), Uuid::nil(), "Team", "moved")
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidArgument("project_id")));

    assert_eq!(event_rows(&conn), 0);
}

#[test]
fn padded_text_round_trips_through_export() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project_id = Uuid::new_v4();
    let at = Utc.with_ymd_and_hms(2013, 11, 4, 16, 0, 0).unwrap();

    service
        .log_event_at(Some("ada"), project_id, "  Team ", " moved  ", at)
        .unwrap();
    service
        .log_event_at(Some("ada"), project_id, "board", "   ", at)
        .unwrap();

    let csv = service.export_events_csv(Some("ada"), project_id).unwrap();
    assert_eq!(
        csv,
        "WHEN,WHO,WHAT\n\
         \"2013-11-04T16:00:00.000Z\",\"  Team \",\" moved  \"\n\
         \"2013-11-04T16:00:00.000Z\",\"board\",\"   \"\n"
    );
}

#[test]
fn events_are_scoped_by_owner_and_project() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project_id = Uuid::new_v4();
    let other_project = Uuid::new_v4();

    service
        .log_event(Some("ada"), project_id, "Team", "ada event")
        .unwrap();
    service
        .log_event(Some("grace"), project_id, "Team", "grace event")
        .unwrap();
    service
        .log_event(None, project_id, "Team", "demo event")
        .unwrap();
    service
        .log_event(Some("ada"), other_project, "Team", "elsewhere")
        .unwrap();

    let ada = service.export_events_csv(Some("ada"), project_id).unwrap();
    assert!(ada.contains("ada event"));
    assert!(!ada.contains("grace event"));
    assert!(!ada.contains("demo event"));
    assert!(!ada.contains("elsewhere"));

    let demo = service.export_events_csv(None, project_id).unwrap();
    assert_eq!(demo.lines().count(), 2);
    assert!(demo.contains("demo event"));
}

#[test]
fn event_log_does_not_require_existing_project() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let unknown = Uuid::new_v4();

    service
        .log_event(Some("ada"), unknown, "board", "orphan row")
        .unwrap();
    assert_eq!(event_rows(&conn), 1);
}
