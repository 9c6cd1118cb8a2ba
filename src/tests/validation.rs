use serde_json::json;

use crate::Error;
use crate::storage::Memory;
use crate::storage::Storage;
use crate::tag_aliases::Status;
use crate::tests::helper;

#[tokio::test]
async fn test_invalid_request_has_no_side_effects() {
    let storage = Memory::new();

    let mut request = helper::request("cat", "cat");
    let error = request.create(&storage).await.unwrap_err();

    match error {
        Error::Invalid(errors) => {
            assert_eq!(vec!["Cannot alias a tag to itself".to_string()], errors);
        }
        other => panic!("Expected invalid request, got {other}"),
    }

    assert_eq!(
        vec!["Cannot alias a tag to itself".to_string()],
        request.errors()
    );
    assert!(!request.tag_alias().unwrap().is_persisted());

    assert_eq!(None, storage.find_tag_alias_by_id(1).await.unwrap());
    assert!(
        storage
            .find_tag_aliases_by_antecedent_name("cat")
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(None, storage.find_forum_topic_by_id(1).await.unwrap());
}

#[tokio::test]
async fn test_all_errors_are_collected() {
    let storage = Memory::new();

    let antecedent_name = "a".repeat(170);
    let consequent_name = "b".repeat(170);

    helper::seed_tag_alias(&storage, &antecedent_name, "c", Status::Active).await;

    let mut request = helper::request(&antecedent_name, &consequent_name);
    assert!(!request.validate(&storage).await.unwrap());

    assert_eq!(
        vec![
            "Antecedent name has already been taken".to_string(),
            "Title is too long (maximum is 255 characters)".to_string(),
        ],
        request.errors()
    );
}

#[tokio::test]
async fn test_alias_messages_are_joined() {
    let storage = Memory::new();

    let mut request = helper::request("-cat", "cat*");
    assert!(!request.validate(&storage).await.unwrap());

    assert_eq!(
        vec!["'-cat' cannot begin with '-' or '~'; 'cat*' cannot contain asterisks".to_string()],
        request.errors()
    );
}

#[tokio::test]
async fn test_skip_forum_skips_topic_validation() {
    let storage = Memory::new();

    let antecedent_name = "a".repeat(170);
    let consequent_name = "b".repeat(170);

    let mut request =
        helper::request_with_flags(&antecedent_name, &consequent_name, json!(null), json!(true));
    assert!(request.validate(&storage).await.unwrap());

    assert!(request.errors().is_empty());
    assert!(request.forum_topic().is_none());
}

#[tokio::test]
async fn test_revalidation_clears_errors() {
    let storage = Memory::new();

    let existing = helper::seed_tag_alias(&storage, "big_cat", "cat", Status::Pending).await;

    let mut request = helper::request("big_cat", "large_cat");
    assert!(!request.validate(&storage).await.unwrap());
    assert!(!request.validate(&storage).await.unwrap());

    // reported once, not once per validation
    assert_eq!(1, request.errors().len());
    assert_eq!(Some(1), existing.id);
}

#[tokio::test]
async fn test_circular_alias() {
    let storage = Memory::new();

    helper::seed_tag_alias(&storage, "large_cat", "big_cat", Status::Pending).await;

    let mut request = helper::request("big_cat", "large_cat");
    assert!(!request.validate(&storage).await.unwrap());

    assert_eq!(
        vec!["Tag alias big_cat -> large_cat would create a circular relation".to_string()],
        request.errors()
    );

    // bypassing secondary checks does not allow a cycle
    let mut request = helper::request_with_flags("big_cat", "large_cat", json!("true"), json!(null));
    assert!(!request.validate(&storage).await.unwrap());
}

#[tokio::test]
async fn test_transitive_alias_is_a_secondary_validation() {
    let storage = Memory::new();

    helper::seed_tag_alias(&storage, "large_cat", "huge_cat", Status::Active).await;

    let mut request = helper::request("big_cat", "large_cat");
    assert!(!request.validate(&storage).await.unwrap());

    assert_eq!(
        vec!["A tag alias for large_cat already exists".to_string()],
        request.errors()
    );

    let mut request = helper::request_with_flags("big_cat", "large_cat", json!("yes"), json!(null));
    assert!(request.validate(&storage).await.unwrap());
    assert!(request.tag_alias().unwrap().skip_secondary_validations);

    request.create(&storage).await.unwrap();
    assert!(request.tag_alias().unwrap().skip_secondary_validations);
}
