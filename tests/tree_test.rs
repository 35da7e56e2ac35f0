mod common;

use common::Harness;
use v4t_client::commands::{CommandArgs, CommandId};
use v4t_client::models::Exercise;
use v4t_client::tree::{CoursesTree, ItemKind};

fn tree(harness: &Harness) -> CoursesTree {
    CoursesTree::new(harness.api.clone(), harness.session.clone(), harness.errors.clone())
}

#[tokio::test]
async fn test_logged_out_shows_login_item() {
    let harness = Harness::new();
    let items = tree(&harness).root_items().await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ItemKind::Login);
    assert_eq!(items[0].command.as_ref().map(|c| c.id), Some(CommandId::Login));
    assert_eq!(harness.api.calls_to("get_user_info"), 0);
}

#[tokio::test]
async fn test_teacher_gets_add_course_item() {
    let harness = Harness::logged_in(common::teacher());
    let items = tree(&harness).root_items().await;

    let kinds: Vec<ItemKind> = items.iter().map(|item| item.kind).collect();
    assert_eq!(kinds, vec![ItemKind::Course, ItemKind::AddCourse]);
    assert_eq!(items[0].label, "Algorithms");
}

#[tokio::test]
async fn test_student_has_no_add_course_item() {
    let harness = Harness::logged_in(common::student());
    let items = tree(&harness).root_items().await;
    assert!(items.iter().all(|item| item.kind == ItemKind::Course));
}

#[tokio::test]
async fn test_user_is_fetched_when_not_cached() {
    let harness = Harness::logged_in(common::student());
    harness.session.set_user(None);

    let items = tree(&harness).root_items().await;

    assert_eq!(items.len(), 1);
    assert_eq!(harness.api.calls_to("get_user_info"), 1);
    assert!(harness.session.current_user().is_some());
}

#[tokio::test]
async fn test_exercises_are_fetched_once_and_cached() {
    let harness = Harness::logged_in(common::student());
    harness
        .api
        .exercises
        .lock()
        .insert(1, vec![Exercise { id: 7, name: "Sorting".to_string() }]);
    let tree = tree(&harness);

    let first = tree.children("Algorithms").await;
    let second = tree.children("Algorithms").await;

    assert_eq!(first, second);
    assert_eq!(harness.api.calls_to("fetch_exercises"), 1);
    let command = first[0].command.clone().unwrap();
    assert_eq!(command.id, CommandId::GetExerciseFiles);
    assert_eq!(
        command.args,
        CommandArgs::Exercise {
            course_name: "Algorithms".to_string(),
            exercise: Exercise { id: 7, name: "Sorting".to_string() },
        }
    );

    assert!(tree.refresh_exercises("Algorithms"));
    tree.children("Algorithms").await;
    assert_eq!(harness.api.calls_to("fetch_exercises"), 2);
}

#[tokio::test]
async fn test_teacher_exercises_open_student_files() {
    let harness = Harness::logged_in(common::teacher());
    harness
        .api
        .exercises
        .lock()
        .insert(1, vec![Exercise { id: 7, name: "Sorting".to_string() }]);

    let items = tree(&harness).children("Algorithms").await;
    assert_eq!(items[0].command.as_ref().map(|c| c.id), Some(CommandId::GetStudentFiles));
}
