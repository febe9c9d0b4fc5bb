use rankdo_core::db::open_db_in_memory;
use rankdo_core::lexorank::{Bucket, Rank, RankError, RebalancePlan};
use rankdo_core::{
    OrderedStore, OrderingPolicy, RepoError, RepoResult, SqliteTodoRepository, TodoId, TodoItem,
    TodoService, TodoServiceError,
};
use uuid::Uuid;

/// SQLite store whose rebalance always fails, as under writer contention.
struct RebalanceRefused<'conn> {
    inner: SqliteTodoRepository<'conn>,
}

impl OrderedStore for RebalanceRefused<'_> {
    fn list_ordered(&self, limit: Option<u32>) -> RepoResult<Vec<TodoItem>> {
        self.inner.list_ordered(limit)
    }

    fn get_first(&self) -> RepoResult<Option<TodoItem>> {
        self.inner.get_first()
    }

    fn get_last(&self) -> RepoResult<Option<TodoItem>> {
        self.inner.get_last()
    }

    fn get_by_id(&self, id: TodoId) -> RepoResult<TodoItem> {
        self.inner.get_by_id(id)
    }

    fn insert(&self, description: &str, rank: &Rank) -> RepoResult<TodoItem> {
        self.inner.insert(description, rank)
    }

    fn update_rank(&self, id: TodoId, rank: &Rank) -> RepoResult<TodoItem> {
        self.inner.update_rank(id, rank)
    }

    fn update_description(&self, id: TodoId, description: &str) -> RepoResult<TodoItem> {
        self.inner.update_description(id, description)
    }

    fn delete(&self, id: TodoId) -> RepoResult<()> {
        self.inner.delete(id)
    }

    fn current_bucket(&self) -> RepoResult<Bucket> {
        self.inner.current_bucket()
    }

    fn apply_rebalance(&self, _plan: &RebalancePlan<TodoId>) -> RepoResult<()> {
        Err(RepoError::InvalidData("rebalance refused".to_string()))
    }

    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.inner.atomically(|_| f(self))
    }
}

fn descriptions(service: &TodoService<SqliteTodoRepository<'_>>) -> Vec<String> {
    service
        .list(None)
        .unwrap()
        .into_iter()
        .map(|item| item.description)
        .collect()
}

fn add_all(service: &TodoService<SqliteTodoRepository<'_>>, names: &[&str]) -> Vec<TodoItem> {
    names.iter().map(|name| service.add(*name).unwrap()).collect()
}

#[test]
fn add_appends_with_default_step() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());

    let ranks: Vec<String> = add_all(&service, &["a", "b", "c", "d"])
        .into_iter()
        .map(|item| item.rank.to_string())
        .collect();

    assert_eq!(ranks, vec!["0i", "0q", "0y", "0y8"]);
    assert_eq!(descriptions(&service), vec!["a", "b", "c", "d"]);
}

#[test]
fn add_trims_and_rejects_blank_descriptions() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());

    assert_eq!(service.add("  water plants \n").unwrap().description, "water plants");
    assert!(matches!(
        service.add("   "),
        Err(TodoServiceError::InvalidDescription)
    ));
    assert_eq!(service.list(None).unwrap().len(), 1);
}

#[test]
fn update_description_keeps_position() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let items = add_all(&service, &["a", "b"]);

    let edited = service.update_description(items[0].id, "a2").unwrap();
    assert_eq!(edited.rank, items[0].rank);
    assert_eq!(descriptions(&service), vec!["a2", "b"]);

    assert!(matches!(
        service.update_description(Uuid::new_v4(), "x"),
        Err(TodoServiceError::TodoNotFound(_))
    ));
}

#[test]
fn delete_removes_only_target() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let items = add_all(&service, &["a", "b", "c"]);

    service.delete(items[1].id).unwrap();
    assert_eq!(descriptions(&service), vec!["a", "c"]);
    assert_eq!(service.get(items[2].id).unwrap().rank, items[2].rank);

    let missing: TodoId = Uuid::new_v4();
    assert!(matches!(
        service.delete(missing),
        Err(TodoServiceError::TodoNotFound(id)) if id == missing
    ));
}

#[test]
fn move_by_neighbors_between_two_ranks() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let items = add_all(&service, &["a", "b", "c"]);

    let moved = service
        .move_by_neighbors(items[0].id, Some("0q"), Some("0y"))
        .unwrap();
    assert_eq!(moved.rank.to_string(), "0u");
    assert_eq!(descriptions(&service), vec!["b", "a", "c"]);
}

#[test]
fn move_by_neighbors_with_single_anchor() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let items = add_all(&service, &["a", "b", "c"]);

    service
        .move_by_neighbors(items[2].id, None, Some(&items[0].rank.to_string()))
        .unwrap();
    assert_eq!(descriptions(&service), vec!["c", "a", "b"]);

    service
        .move_by_neighbors(items[2].id, Some("0q"), Some(""))
        .unwrap();
    assert_eq!(descriptions(&service), vec!["a", "b", "c"]);
}

#[test]
fn move_by_neighbors_errors_are_typed() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let item = service.add("a").unwrap();

    assert!(matches!(
        service.move_by_neighbors(item.id, None, None),
        Err(TodoServiceError::MissingNeighbor)
    ));
    assert!(matches!(
        service.move_by_neighbors(item.id, Some("0t"), Some("0m")),
        Err(TodoServiceError::Rank(RankError::InvalidRange { .. }))
    ));
    assert!(matches!(
        service.move_by_neighbors(item.id, Some("bogus"), None),
        Err(TodoServiceError::Rank(RankError::Format { .. }))
    ));
    assert!(matches!(
        service.move_by_neighbors(Uuid::new_v4(), Some("0a"), None),
        Err(TodoServiceError::TodoNotFound(_))
    ));
    assert_eq!(service.get(item.id).unwrap().rank, item.rank);
}

#[test]
fn move_onto_an_occupied_rank_is_a_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let items = add_all(&service, &["a", "b"]);

    // next("0a") with the default step is "0i", which `a` already holds.
    let err = service
        .move_by_neighbors(items[1].id, Some("0a"), None)
        .unwrap_err();
    assert!(matches!(err, TodoServiceError::DuplicateRank(ref rank) if rank == "0i"));
    assert_eq!(descriptions(&service), vec!["a", "b"]);
}

#[test]
fn move_to_index_reorders_against_other_items() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let items = add_all(&service, &["a", "b", "c"]);

    service.move_to_index(items[2].id, 0).unwrap();
    assert_eq!(descriptions(&service), vec!["c", "a", "b"]);

    service.move_to_index(items[2].id, 1).unwrap();
    assert_eq!(descriptions(&service), vec!["a", "c", "b"]);

    service.move_to_index(items[0].id, 2).unwrap();
    assert_eq!(descriptions(&service), vec!["c", "b", "a"]);

    service.move_to_index(items[2].id, 99).unwrap();
    assert_eq!(descriptions(&service), vec!["b", "a", "c"]);
}

#[test]
fn move_to_index_of_only_item_is_stable() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let item = service.add("solo").unwrap();

    let moved = service.move_to_index(item.id, 0).unwrap();
    assert_eq!(moved.rank.to_string(), "0i");
}

#[test]
fn rebalance_rotates_bucket_and_keeps_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let service = TodoService::new(repo);
    let items = add_all(&service, &["a", "b", "c"]);
    service
        .move_by_neighbors(items[2].id, Some("0i"), Some("0i1"))
        .unwrap();
    let before = descriptions(&service);

    let outcome = service.rebalance().unwrap();
    assert_eq!(outcome.from_bucket, Bucket::Zero);
    assert_eq!(outcome.to_bucket, Bucket::One);
    assert_eq!(outcome.rewritten, 3);

    let listed = service.list(None).unwrap();
    assert_eq!(descriptions(&service), before);
    let ranks: Vec<String> = listed.iter().map(|item| item.rank.to_string()).collect();
    assert_eq!(ranks, vec!["19", "1i", "1r"]);

    let appended = service.add("d").unwrap();
    assert_eq!(appended.rank.to_string(), "1z");
}

#[test]
fn rebalance_of_empty_collection_moves_fresh_inserts() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let service = TodoService::new(repo);

    assert_eq!(service.rebalance().unwrap().rewritten, 0);
    assert_eq!(service.add("first").unwrap().rank.to_string(), "1i");
}

#[test]
fn deep_rank_triggers_automatic_rebalance() {
    let conn = open_db_in_memory().unwrap();
    let policy = OrderingPolicy {
        rebalance_max_digits: Some(2),
        ..OrderingPolicy::default()
    };
    let service = TodoService::with_policy(SqliteTodoRepository::try_new(&conn).unwrap(), policy);
    let items = add_all(&service, &["a", "b", "c"]);

    // between("0i", "0i1") needs three digits.
    let moved = service
        .move_by_neighbors(items[2].id, Some("0i"), Some("0i1"))
        .unwrap();

    assert_eq!(moved.rank.to_string(), "1i");
    assert_eq!(descriptions(&service), vec!["a", "c", "b"]);
    let conn_bucket = SqliteTodoRepository::try_new(&conn)
        .unwrap()
        .current_bucket()
        .unwrap();
    assert_eq!(conn_bucket, Bucket::One);
}

#[test]
fn manual_policy_never_rebalances_on_its_own() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let items = add_all(&service, &["a", "b"]);

    let moved = service
        .move_by_neighbors(items[1].id, Some("0i"), Some("0i1"))
        .unwrap();
    assert_eq!(moved.rank.to_string(), "0i0i");
}

#[test]
fn failed_automatic_rebalance_discards_the_triggering_move() {
    let conn = open_db_in_memory().unwrap();
    let policy = OrderingPolicy {
        rebalance_max_digits: Some(2),
        ..OrderingPolicy::default()
    };
    let store = RebalanceRefused {
        inner: SqliteTodoRepository::try_new(&conn).unwrap(),
    };
    let service = TodoService::with_policy(store, policy);
    let items = add_all_with(&service, &["a", "b", "c"]);

    let err = service
        .move_by_neighbors(items[2].id, Some("0i"), Some("0i1"))
        .unwrap_err();
    assert!(matches!(err, TodoServiceError::Repo(RepoError::InvalidData(_))));

    let ranks: Vec<String> = service
        .list(None)
        .unwrap()
        .into_iter()
        .map(|item| item.rank.to_string())
        .collect();
    assert_eq!(ranks, vec!["0i", "0q", "0y"]);
}

#[test]
fn failed_automatic_rebalance_discards_the_triggering_add() {
    let conn = open_db_in_memory().unwrap();
    let policy = OrderingPolicy {
        step: std::num::NonZeroU32::new(1).unwrap(),
        rebalance_max_digits: Some(2),
    };
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    repo.insert("tail", &"0zz".parse().unwrap()).unwrap();
    let service = TodoService::with_policy(RebalanceRefused { inner: repo }, policy);

    // next("0zz", 1) overflows into "0zz1", past the two-digit threshold.
    assert!(service.add("new").is_err());
    assert_eq!(service.list(None).unwrap().len(), 1);
}

fn add_all_with<S: OrderedStore>(service: &TodoService<S>, names: &[&str]) -> Vec<TodoItem> {
    names.iter().map(|name| service.add(*name).unwrap()).collect()
}
