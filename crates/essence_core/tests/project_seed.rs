use essence_core::db::open_db_in_memory;
use essence_core::{
    ProjectService, SqliteProjectRepository, Taxonomy, TrackerError, DEFAULT_PROJECT_NAME,
};
use rusqlite::Connection;
use std::collections::HashSet;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(conn: &Connection) -> ProjectService<'static, SqliteProjectRepository<'_>> {
    let repo = SqliteProjectRepository::try_new(conn).unwrap();
    ProjectService::new(repo, Taxonomy::builtin().unwrap())
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_project_seeds_full_hierarchy() {
    let conn = setup();
    let service = service(&conn);
    let taxonomy = Taxonomy::builtin().unwrap();

    let project_id = service
        .create_project(Some("ada"), "Apollo", "Moon landing", false)
        .unwrap();

    let overview = service.project_overview(Some("ada"), project_id).unwrap();
    assert_eq!(overview.project.name, "Apollo");
    assert_eq!(overview.project.owner_id.as_deref(), Some("ada"));
    assert!(!overview.project.is_demo);
    assert_eq!(overview.concerns.len(), taxonomy.concern_count());

    let concern_orders: Vec<u32> = overview.concerns.iter().map(|c| c.concern.order).collect();
    assert_eq!(concern_orders, vec![1, 2, 3]);

    let alpha_orders: Vec<u32> = overview
        .concerns
        .iter()
        .flat_map(|c| c.alphas.iter().map(|a| a.alpha.order))
        .collect();
    assert_eq!(alpha_orders, (1..=7).collect::<Vec<u32>>());

    for alpha in overview.concerns.iter().flat_map(|c| c.alphas.iter()) {
        let state_orders: Vec<u32> = alpha.states.iter().map(|s| s.order).collect();
        let expected: Vec<u32> = (1..=alpha.states.len() as u32).collect();
        assert_eq!(state_orders, expected, "alpha {}", alpha.alpha.name);
        assert_eq!(alpha.alpha.completion, 0.0);
        assert_eq!(alpha.current_state_name(), None);
    }

    assert_eq!(count_rows(&conn, "projects"), 1);
    assert_eq!(count_rows(&conn, "concerns"), taxonomy.concern_count() as i64);
    assert_eq!(count_rows(&conn, "alphas"), taxonomy.alpha_count() as i64);
    assert_eq!(count_rows(&conn, "states"), taxonomy.state_count() as i64);
}

#[test]
fn empty_name_or_description_is_rejected_without_writes() {
    let conn = setup();
    let service = service(&conn);

    let err = service
        .create_project(Some("ada"), "", "x", false)
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidArgument("name")));

    let err = service
        .create_project(Some("ada"), "x", "", false)
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidArgument("description")));

    for table in ["projects", "concerns", "alphas", "states"] {
        assert_eq!(count_rows(&conn, table), 0, "table {table}");
    }
}

#[test]
fn project_text_is_stored_as_given() {
    let conn = setup();
    let service = service(&conn);

    let project_id = service
        .create_project(Some("ada"), " Apollo  ", "   ", false)
        .unwrap();

    let project = service.project_overview(Some("ada"), project_id).unwrap().project;
    assert_eq!(project.name, " Apollo  ");
    assert_eq!(project.description, "   ");
}

#[test]
fn non_demo_project_requires_owner() {
    let conn = setup();
    let service = service(&conn);

    let err = service
        .create_project(None, "Apollo", "Moon landing", false)
        .unwrap_err();
    assert!(matches!(err, TrackerError::Unauthenticated));
    assert_eq!(count_rows(&conn, "projects"), 0);
}

#[test]
fn demo_project_is_ownerless_even_with_caller() {
    let conn = setup();
    let service = service(&conn);

    let demo_id = service
        .create_project(Some("ada"), "Demo", "Try it out", true)
        .unwrap();

    let demo = service.find_demo_project().unwrap().unwrap();
    assert_eq!(demo.id, demo_id);
    assert!(demo.is_demo);
    assert_eq!(demo.owner_id, None);

    let owner_less_children: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM states WHERE owner_id IS NULL AND project_id = ?1;",
            [demo_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(owner_less_children, 41);
    assert!(service.list_projects(Some("ada")).unwrap().is_empty());
}

#[test]
fn two_owners_get_independent_hierarchies() {
    let conn = setup();
    let service = service(&conn);

    let first = service
        .create_project(Some("ada"), "Kernel", "Same taxonomy", false)
        .unwrap();
    let second = service
        .create_project(Some("grace"), "Kernel", "Same taxonomy", false)
        .unwrap();
    assert_ne!(first, second);

    let first_overview = service.project_overview(Some("ada"), first).unwrap();
    let second_overview = service.project_overview(Some("grace"), second).unwrap();

    let ids = |overview: &essence_core::ProjectOverview| -> HashSet<uuid::Uuid> {
        overview
            .concerns
            .iter()
            .flat_map(|c| {
                std::iter::once(c.concern.id).chain(c.alphas.iter().flat_map(|a| {
                    std::iter::once(a.alpha.id).chain(a.states.iter().map(|s| s.id))
                }))
            })
            .collect()
    };
    assert!(ids(&first_overview).is_disjoint(&ids(&second_overview)));
    assert!(second_overview
        .concerns
        .iter()
        .flat_map(|c| c.alphas.iter())
        .all(|a| a.alpha.project_id == second && a.alpha.owner_id.as_deref() == Some("grace")));

    let err = service.project_overview(Some("grace"), first).unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));
    assert_eq!(service.list_projects(Some("ada")).unwrap().len(), 1);
}

#[test]
fn failed_child_insert_rolls_back_whole_project() {
    let conn = setup();
    conn.execute_batch(
        "CREATE TRIGGER reject_late_states
         BEFORE INSERT ON states
         WHEN NEW.sort_order = 6
         BEGIN
             SELECT RAISE(ABORT, 'simulated storage failure');
         END;",
    )
    .unwrap();
    let service = service(&conn);

    let err = service
        .create_project(Some("ada"), "Apollo", "Moon landing", false)
        .unwrap_err();
    assert!(matches!(err, TrackerError::Repo(_)));

    for table in ["projects", "concerns", "alphas", "states"] {
        assert_eq!(count_rows(&conn, table), 0, "table {table}");
    }
}

#[test]
fn ensure_default_project_creates_once() {
    let conn = setup();
    let service = service(&conn);

    let first = service.ensure_default_project(Some("ada")).unwrap();
    let second = service.ensure_default_project(Some("ada")).unwrap();
    assert_eq!(first, second);

    let projects = service.list_projects(Some("ada")).unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, DEFAULT_PROJECT_NAME);

    let err = service.ensure_default_project(None).unwrap_err();
    assert!(matches!(err, TrackerError::Unauthenticated));
}

#[test]
fn ensure_default_project_keeps_existing_project() {
    let conn = setup();
    let service = service(&conn);

    let existing = service
        .create_project(Some("ada"), "Apollo", "Moon landing", false)
        .unwrap();
    assert_eq!(service.ensure_default_project(Some("ada")).unwrap(), existing);
    assert_eq!(count_rows(&conn, "projects"), 1);
}

#[test]
fn custom_taxonomy_drives_seeding() {
    let conn = setup();
    let taxonomy = Taxonomy::from_json_str(
        r#"{
            "concerns": [
                { "name": "Delivery", "description": "Shipping",
                  "alphas": [ { "name": "Build", "states": ["Started", "Done"] } ] }
            ],
            "alpha_descriptions": { "build": "Compile it" },
            "state_descriptions": { "build": { "started": "Begun", "done": "Finished" } }
        }"#,
    )
    .unwrap();
    let service = ProjectService::new(SqliteProjectRepository::try_new(&conn).unwrap(), &taxonomy);

    let project_id = service
        .create_project(Some("ada"), "Tiny", "Two states", false)
        .unwrap();
    let overview = service.project_overview(Some("ada"), project_id).unwrap();

    let build = &overview.concerns[0].alphas[0];
    assert_eq!(build.alpha.description, "Compile it");
    assert_eq!(build.states[1].name, "Done");
    assert_eq!(build.states[1].description, "Finished");
    assert_eq!(count_rows(&conn, "states"), 2);
}
