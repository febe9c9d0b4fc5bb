use rankdo_core::db::open_db_in_memory;
use rankdo_core::lexorank::{parse, Bucket, Rank, RankError, DEFAULT_STEP};
use rankdo_core::{MoveIntent, OrderedStore, PlanError, ReorderPlanner, SqliteTodoRepository};

fn rank(value: &str) -> Rank {
    parse(value).unwrap()
}

fn seed(repo: &SqliteTodoRepository<'_>, ranks: &[&str]) {
    for value in ranks {
        repo.insert(value, &rank(value)).unwrap();
    }
}

#[test]
fn append_to_empty_collection_uses_middle_of_current_bucket() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let planned = planner.plan(&MoveIntent::AppendAtEnd).unwrap();
    assert_eq!(planned.to_string(), "0i");
}

#[test]
fn append_follows_the_last_rank() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    seed(&repo, &["0a", "0t"]);
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let planned = planner.plan(&MoveIntent::AppendAtEnd).unwrap();
    assert_eq!(planned.to_string(), "0t8");
}

#[test]
fn move_to_inner_index_lands_between_its_neighbours() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    seed(&repo, &["0m", "0t"]);
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let planned = planner
        .plan(&MoveIntent::MoveToIndex {
            index: 1,
            moving: None,
        })
        .unwrap();
    assert!(rank("0m") < planned && planned < rank("0t"));
}

#[test]
fn move_to_front_goes_before_first_in_same_bucket() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    seed(&repo, &["0a", "0m"]);
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let planned = planner
        .plan(&MoveIntent::MoveToIndex {
            index: 0,
            moving: None,
        })
        .unwrap();
    assert!(planned < rank("0a"));
    assert_eq!(planned.bucket(), Bucket::Zero);
}

#[test]
fn move_past_the_end_appends_after_last() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    seed(&repo, &["0m", "0t"]);
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let past_end = planner
        .plan(&MoveIntent::MoveToIndex {
            index: 7,
            moving: None,
        })
        .unwrap();
    let appended = planner.plan(&MoveIntent::AppendAtEnd).unwrap();
    assert_eq!(past_end, appended);
    assert!(past_end > rank("0t"));
}

#[test]
fn move_to_index_skips_the_moving_item() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    seed(&repo, &["0i", "0q", "0y"]);
    let moving = repo.get_first().unwrap().unwrap().id;
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let planned = planner
        .plan(&MoveIntent::MoveToIndex {
            index: 1,
            moving: Some(moving),
        })
        .unwrap();
    assert!(rank("0q") < planned && planned < rank("0y"));
}

#[test]
fn move_to_index_in_empty_collection_uses_middle() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    for index in [0, 3] {
        let planned = planner
            .plan(&MoveIntent::MoveToIndex {
                index,
                moving: None,
            })
            .unwrap();
        assert_eq!(planned.to_string(), "0i");
    }
}

#[test]
fn single_neighbour_moves_step_away_from_anchor() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let after = planner
        .plan(&MoveIntent::InsertAfterOnly(rank("0i")))
        .unwrap();
    let before = planner
        .plan(&MoveIntent::InsertBeforeOnly(rank("0i")))
        .unwrap();
    assert_eq!(after.to_string(), "0q");
    assert_eq!(before.to_string(), "0a");
}

#[test]
fn insert_between_reversed_bounds_is_invalid_range() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let planner = ReorderPlanner::new(&repo, DEFAULT_STEP);

    let err = planner
        .plan(&MoveIntent::InsertBetween(rank("0t"), rank("0m")))
        .unwrap_err();
    assert!(matches!(
        err,
        PlanError::Rank(RankError::InvalidRange { .. })
    ));
}

#[test]
fn from_neighbors_requires_an_anchor() {
    assert!(matches!(
        MoveIntent::from_neighbors(None, None),
        Err(PlanError::MissingNeighbor)
    ));
    assert!(matches!(
        MoveIntent::from_neighbors(Some(""), Some("")),
        Err(PlanError::MissingNeighbor)
    ));
}

#[test]
fn from_neighbors_maps_present_ranks_to_intents() {
    assert_eq!(
        MoveIntent::from_neighbors(Some("0m"), None).unwrap(),
        MoveIntent::InsertAfterOnly(rank("0m"))
    );
    assert_eq!(
        MoveIntent::from_neighbors(Some(""), Some("0t")).unwrap(),
        MoveIntent::InsertBeforeOnly(rank("0t"))
    );
    assert_eq!(
        MoveIntent::from_neighbors(Some("0m"), Some("0t")).unwrap(),
        MoveIntent::InsertBetween(rank("0m"), rank("0t"))
    );
}

#[test]
fn from_neighbors_rejects_malformed_rank() {
    assert!(matches!(
        MoveIntent::from_neighbors(Some("9a"), None),
        Err(PlanError::Rank(RankError::Format { .. }))
    ));
}
