use crate::Error;
use crate::storage::Storage;
use crate::tests::helper;
use crate::tests::helper::FailAt;
use crate::tests::helper::FailingStorage;

async fn assert_nothing_stored(storage: &FailingStorage) {
    assert_eq!(None, storage.find_tag_alias_by_id(1).await.unwrap());
    assert!(
        storage
            .find_tag_aliases_by_antecedent_name("big_cat")
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(None, storage.find_forum_topic_by_id(1).await.unwrap());
}

#[tokio::test]
async fn test_failing_forum_topic_rolls_back_alias() {
    let storage = FailingStorage::new(FailAt::CreateForumTopic);

    let mut request = helper::request("big_cat", "large_cat");
    let error = request.create(&storage).await.unwrap_err();

    assert!(matches!(error, Error::Storage(_)));
    assert_eq!(
        "Storage error: Connection error: broken pipe",
        error.to_string()
    );
    assert!(request.errors().is_empty());

    assert_nothing_stored(&storage).await;

    // the request keeps its unsaved candidates
    assert!(!request.tag_alias().unwrap().is_persisted());
    assert_eq!(None, request.forum_topic().unwrap().id);
}

#[tokio::test]
async fn test_failing_back_reference_rolls_back_everything() {
    let storage = FailingStorage::new(FailAt::UpdateTagAliasForumReferences);

    let mut request = helper::request("big_cat", "large_cat");
    let error = request.create(&storage).await.unwrap_err();

    assert!(matches!(error, Error::Storage(_)));

    assert_nothing_stored(&storage).await;
}

#[tokio::test]
async fn test_failing_commit_stores_nothing() {
    let storage = FailingStorage::new(FailAt::Commit);

    let mut request = helper::request("big_cat", "large_cat");
    let error = request.create(&storage).await.unwrap_err();

    assert!(matches!(error, Error::Storage(_)));

    assert_nothing_stored(&storage).await;
}

#[tokio::test]
async fn test_retry_after_failure() {
    let storage = FailingStorage::new(FailAt::CreateForumTopic);

    let mut request = helper::request("big_cat", "large_cat");
    assert!(request.create(&storage).await.is_err());

    // same request against working storage
    request.create(&storage.inner).await.unwrap();

    let tag_alias = request.tag_alias().unwrap();
    assert_eq!(Some(1), tag_alias.id);
    assert_eq!(Some(1), tag_alias.forum_topic_id);
    assert_eq!(Some(1), tag_alias.forum_post_id);
}
