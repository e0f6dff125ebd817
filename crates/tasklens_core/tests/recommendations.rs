use std::cell::Cell;
use tasklens_core::db::{open_db_in_memory, DbError};
use tasklens_core::model::DAY_MS;
use tasklens_core::{
    Plan, Recommendation, RecommendationCategory, RecommendationId, RecommendationService,
    RecommendationStore, RepoError, RepoResult, SqliteRecommendationRepository,
    SqliteTaskRepository, Task,
};

const NOW: i64 = 20_000 * DAY_MS;

fn seed(conn: &rusqlite::Connection, tasks: &[Task]) {
    let repo = SqliteTaskRepository::try_new(conn).unwrap();
    for task in tasks {
        repo.create_task(task).unwrap();
    }
}

fn service(
    conn: &rusqlite::Connection,
) -> RecommendationService<SqliteTaskRepository<'_>, SqliteRecommendationRepository<'_>> {
    RecommendationService::new(
        SqliteTaskRepository::try_new(conn).unwrap(),
        SqliteRecommendationRepository::try_new(conn).unwrap(),
    )
}

fn completed(user: &str, created_at: i64) -> Task {
    let mut task = Task::new(user, "done", created_at, NOW + DAY_MS);
    task.is_completed = true;
    task
}

#[test]
fn empty_window_persists_nothing() {
    let conn = open_db_in_memory().unwrap();
    // Outside the 7-day window.
    seed(&conn, &[Task::new("u1", "old", NOW - 8 * DAY_MS, NOW - DAY_MS)]);
    let service = service(&conn);

    let created = service.generate_recommendations_at("u1", NOW).unwrap();
    assert!(created.is_empty());
    assert!(service.get_user_recommendations("u1").unwrap().is_empty());
}

#[test]
fn deadline_text_reports_exact_overdue_count() {
    let conn = open_db_in_memory().unwrap();
    let mut tasks: Vec<Task> = (0..3)
        .map(|_| Task::new("u1", "late", NOW - DAY_MS, NOW - 1))
        .collect();
    tasks.extend((0..2).map(|_| completed("u1", NOW - DAY_MS)));
    seed(&conn, &tasks);
    let service = service(&conn);

    let created = service.generate_recommendations_at("u1", NOW).unwrap();
    let deadline = created
        .iter()
        .find(|item| item.category == RecommendationCategory::Deadline)
        .expect("deadline recommendation should be emitted");
    assert!(deadline.text.contains('3'));
    assert_eq!(deadline.created_at, NOW);
    assert!(!deadline.is_read);

    // 2 of 5 completed is below 50%.
    assert!(created
        .iter()
        .any(|item| item.category == RecommendationCategory::Productivity));
}

#[test]
fn window_start_is_inclusive() {
    let conn = open_db_in_memory().unwrap();
    seed(
        &conn,
        &[Task::new("u1", "edge", NOW - 7 * DAY_MS, NOW - 1)],
    );
    let service = service(&conn);

    let created = service.generate_recommendations_at("u1", NOW).unwrap();
    assert!(created
        .iter()
        .any(|item| item.category == RecommendationCategory::Deadline));
}

#[test]
fn generation_only_considers_the_requesting_user() {
    let conn = open_db_in_memory().unwrap();
    seed(
        &conn,
        &[
            completed("u1", NOW - DAY_MS),
            Task::new("u2", "late", NOW - DAY_MS, NOW - 1),
        ],
    );
    let service = service(&conn);

    assert!(service
        .generate_recommendations_at("u1", NOW)
        .unwrap()
        .is_empty());
    assert_eq!(service.generate_recommendations_at("u2", NOW).unwrap().len(), 2);
    assert!(service.get_user_recommendations("u1").unwrap().is_empty());
}

#[test]
fn balance_and_complexity_fire_from_stored_history() {
    let conn = open_db_in_memory().unwrap();
    let mut tasks = Vec::new();
    for (day, count) in [1_i64, 1, 1, 5].iter().enumerate() {
        let created_at = NOW - (day as i64 + 1) * DAY_MS;
        for _ in 0..*count {
            let mut task = completed("u1", created_at);
            task.plan = Some(Plan::from_descriptions(vec!["step"; 6]));
            tasks.push(task);
        }
    }
    seed(&conn, &tasks);
    let service = service(&conn);

    let categories: Vec<_> = service
        .generate_recommendations_at("u1", NOW)
        .unwrap()
        .into_iter()
        .map(|item| item.category)
        .collect();
    assert_eq!(
        categories,
        vec![
            RecommendationCategory::Balance,
            RecommendationCategory::Complexity
        ]
    );
}

#[test]
fn listing_is_newest_first() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &[Task::new("u1", "late", NOW - DAY_MS, NOW - 1)]);
    let service = service(&conn);

    service.generate_recommendations_at("u1", NOW).unwrap();
    let later = service
        .generate_recommendations_at("u1", NOW + 1_000)
        .unwrap();

    let listed = service.get_user_recommendations("u1").unwrap();
    assert_eq!(listed.len(), 4);
    assert!(listed.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at));
    assert_eq!(listed[0].created_at, NOW + 1_000);
    assert_eq!(listed[0].id, later[1].id);
}

#[test]
fn mark_as_read_roundtrip_keeps_record_identity() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &[Task::new("u1", "late", NOW - DAY_MS, NOW - 1)]);
    let service = service(&conn);

    let created = service.generate_recommendations_at("u1", NOW).unwrap();
    let original = created[0].clone();
    assert!(!original.is_read);

    assert!(service.mark_as_read(original.id, "u1").unwrap());

    let listed = service.get_user_recommendations("u1").unwrap();
    let reloaded = listed
        .iter()
        .find(|item| item.id == original.id)
        .unwrap();
    assert!(reloaded.is_read);
    assert_eq!(reloaded.text, original.text);
    assert_eq!(reloaded.category, original.category);
    assert_eq!(reloaded.created_at, original.created_at);
    assert_eq!(reloaded.user_id, original.user_id);
}

#[test]
fn mark_as_read_rejects_other_users_and_unknown_ids() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &[Task::new("u1", "late", NOW - DAY_MS, NOW - 1)]);
    let service = service(&conn);

    let created = service.generate_recommendations_at("u1", NOW).unwrap();
    let target = created[0].id;

    assert!(!service.mark_as_read(target, "intruder").unwrap());
    assert!(!service
        .mark_as_read(RecommendationId::new_v4(), "u1")
        .unwrap());

    let listed = service.get_user_recommendations("u1").unwrap();
    assert!(listed.iter().all(|item| !item.is_read));
}

#[test]
fn recommendation_serializes_with_external_category_names() {
    let recommendation =
        Recommendation::new("u1", RecommendationCategory::Balance, "spread out", NOW);
    let value = serde_json::to_value(&recommendation).unwrap();
    assert_eq!(value["category"], "Balance");
    assert_eq!(value["is_read"], false);
    assert_eq!(value["user_id"], "u1");
}

/// Store that accepts a fixed number of inserts and then reports unavailability.
struct FlakyStore<'conn> {
    inner: SqliteRecommendationRepository<'conn>,
    remaining_inserts: Cell<usize>,
}

impl RecommendationStore for FlakyStore<'_> {
    fn insert(&self, recommendation: &Recommendation) -> RepoResult<Recommendation> {
        if self.remaining_inserts.get() == 0 {
            return Err(RepoError::Db(DbError::Sqlite(
                rusqlite::Error::InvalidQuery,
            )));
        }
        self.remaining_inserts.set(self.remaining_inserts.get() - 1);
        self.inner.insert(recommendation)
    }

    fn find_by_id(
        &self,
        id: RecommendationId,
        user_id: &str,
    ) -> RepoResult<Option<Recommendation>> {
        self.inner.find_by_id(id, user_id)
    }

    fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Recommendation>> {
        self.inner.list_by_user(user_id)
    }

    fn save(&self, recommendation: &Recommendation) -> RepoResult<()> {
        self.inner.save(recommendation)
    }
}

#[test]
fn failed_emission_propagates_and_keeps_earlier_ones() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &[Task::new("u1", "late", NOW - DAY_MS, NOW - 1)]);
    let service = RecommendationService::new(
        SqliteTaskRepository::try_new(&conn).unwrap(),
        FlakyStore {
            inner: SqliteRecommendationRepository::try_new(&conn).unwrap(),
            remaining_inserts: Cell::new(1),
        },
    );

    let err = service.generate_recommendations_at("u1", NOW).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    let listed = service.get_user_recommendations("u1").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].category, RecommendationCategory::Deadline);
}
