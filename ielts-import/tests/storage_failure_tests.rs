//! Storage rejections during import
//!
//! A write refused by the database (constraint or trigger) is permanent: the
//! document is skipped and counted, and the rest of the batch still lands.

mod helpers;

use helpers::{batches, count, setup_store};
use ielts_import::{Collection, ImportOptions, Importer, SkipReason};

#[tokio::test]
async fn test_rejected_question_is_skipped_and_counted() {
    let store = setup_store().await;
    sqlx::query(
        r#"
        CREATE TRIGGER reject_question_two
        BEFORE INSERT ON questions
        WHEN NEW.question_number = 2
        BEGIN
            SELECT RAISE(ABORT, 'question 2 rejected');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    let built = batches(1, 1, 1, 4);
    let summary = Importer::new(&store, ImportOptions::default())
        .run(&built)
        .await
        .unwrap();

    assert_eq!(
        summary.skipped_for(Collection::Questions, SkipReason::PermanentStorageFailure),
        1
    );
    assert_eq!(summary.stats(Collection::Questions).inserted, 3);
    assert_eq!(count(&store, "questions").await, 3);
    assert!(summary.to_string().contains("WITH SKIPS"));
}

#[tokio::test]
async fn test_rejected_section_skips_its_subtree() {
    let store = setup_store().await;
    sqlx::query(
        r#"
        CREATE TRIGGER reject_part_two
        BEFORE INSERT ON test_sections
        WHEN NEW.part_number = 2
        BEGIN
            SELECT RAISE(ABORT, 'part 2 rejected');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    let summary = Importer::new(&store, ImportOptions::default())
        .run(&batches(1, 2, 1, 2))
        .await
        .unwrap();

    assert_eq!(
        summary.skipped_for(Collection::Sections, SkipReason::PermanentStorageFailure),
        1
    );
    assert_eq!(
        summary.skipped_for(Collection::Groups, SkipReason::DanglingReference),
        1
    );
    assert_eq!(
        summary.skipped_for(Collection::Questions, SkipReason::DanglingReference),
        2
    );
    assert_eq!(count(&store, "questions").await, 2);
}
