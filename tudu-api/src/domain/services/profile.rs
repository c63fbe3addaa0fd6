use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;

use crate::domain::{
    models::{AssetId, DefaultAvatars, RemoteAsset, UserId},
    ports::{
        inbound::{ProfileService, UpdateProfileRequest},
        outbound::{AvatarProcessor, BlobStore, ProfilePatch, ProfileStore},
    },
    ProfileError, ProfileResponse,
};

/// Implementation of the ProfileService inbound port.
///
/// Orchestrates the avatar update workflow across the primary store and the
/// blob store. The two systems fail independently and share no transaction,
/// so consistency comes from ordering plus compensation: the new blob is
/// uploaded before the database commit (a failed commit deletes the orphan),
/// and the replaced blob is deleted only after the commit (a crash in between
/// leaves an orphan blob, never a dangling reference).
pub struct ProfileServiceImpl<S, B, P> {
    store: Arc<S>,
    blob_store: Arc<B>,
    processor: Arc<P>,
    default_avatars: DefaultAvatars,
    bcrypt_cost: u32,
}

impl<S, B, P> ProfileServiceImpl<S, B, P> {
    pub fn new(
        store: Arc<S>,
        blob_store: Arc<B>,
        processor: Arc<P>,
        default_avatars: DefaultAvatars,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            store,
            blob_store,
            processor,
            default_avatars,
            bcrypt_cost,
        }
    }
}

impl<S, B: BlobStore, P> ProfileServiceImpl<S, B, P> {
    async fn hash_password(&self, password: String) -> Result<String, ProfileError> {
        let cost = self.bcrypt_cost;
        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|err| ProfileError::Internal(format!("password hashing task failed: {err}")))?
            .map_err(|err| ProfileError::Internal(format!("failed to hash password: {err}")))
    }

    /// Compensation for a failed commit: delete the blob uploaded earlier in
    /// this request. Best-effort — its own failure is logged and must not
    /// mask the commit error.
    async fn rollback_upload(&self, uploaded: Option<&RemoteAsset>) {
        let Some(asset) = uploaded else { return };

        if let Err(err) = self.blob_store.delete(&asset.asset_id).await {
            tracing::warn!(
                asset_id = %asset.asset_id,
                "failed to roll back avatar upload: {err}"
            );
        }
    }

    /// Post-commit cleanup of the asset the update replaced. Skipped when the
    /// old pointer is empty, points at the new asset, or names a shared
    /// default avatar. Best-effort — the response has already committed.
    async fn delete_replaced(&self, previous: Option<&AssetId>, new_id: &AssetId) {
        let Some(old_id) = previous else { return };

        if old_id == new_id || self.default_avatars.contains(old_id) {
            return;
        }

        if let Err(err) = self.blob_store.delete(old_id).await {
            tracing::warn!(asset_id = %old_id, "failed to delete replaced avatar: {err}");
        }
    }
}

#[async_trait]
impl<S: ProfileStore, B: BlobStore, P: AvatarProcessor> ProfileService
    for ProfileServiceImpl<S, B, P>
{
    async fn get_profile(&self, user_id: &UserId) -> Result<ProfileResponse, ProfileError> {
        let record = self.store.get_profile(user_id).await?;

        Ok(record.into())
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        request: UpdateProfileRequest,
    ) -> Result<ProfileResponse, ProfileError> {
        if !request.has_changes() {
            return Err(ProfileError::NothingToUpdate);
        }

        // Snapshot before any mutation — identifies the asset this update
        // replaces, and catches a missing user before side effects happen.
        let previous_asset = self.store.find_current_asset(user_id).await?;

        let mut patch = ProfilePatch {
            username: request.username,
            email: request.email,
            password_hash: None,
            avatar: None,
        };

        if let Some(password) = request.password {
            patch.password_hash = Some(self.hash_password(password).await?);
        }

        let mut uploaded: Option<RemoteAsset> = None;
        if let Some(image) = request.image {
            tracing::debug!(
                declared_content_type = ?image.content_type,
                declared_filename = ?image.filename,
                size = image.bytes.len(),
                "processing avatar upload"
            );

            // Validation and re-encoding are CPU-bound; keep them off the
            // request-handling threads.
            let processor = Arc::clone(&self.processor);
            let sanitized = task::spawn_blocking(move || {
                processor.validate(&image.bytes)?;
                processor.transcode(&image.bytes)
            })
            .await
            .map_err(|err| {
                ProfileError::Internal(format!("avatar processing task failed: {err}"))
            })??;

            let asset = self
                .blob_store
                .put(&sanitized.bytes)
                .await
                .map_err(|err| ProfileError::Upload(err.to_string()))?;

            patch.avatar = Some(asset.clone());
            uploaded = Some(asset);
        }

        let record = match self.store.update_profile(user_id, &patch).await {
            Ok(record) => record,
            Err(err) => {
                self.rollback_upload(uploaded.as_ref()).await;
                return Err(err.into());
            }
        };

        if let Some(new_asset) = &uploaded {
            self.delete_replaced(previous_asset.as_ref(), &new_asset.asset_id)
                .await;
        }

        Ok(record.into())
    }

    async fn delete_account(&self, user_id: &UserId) -> Result<(), ProfileError> {
        // A single row delete. The avatar blob is left in place.
        self.store.delete_user(user_id).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock;

    use super::*;
    use crate::domain::{
        models::{SanitizedAvatar, UploadCandidate},
        ports::outbound::{BlobStoreError, StoreError},
        AvatarProcessingError, ConflictField, ProfileRecord,
    };

    const TEST_BCRYPT_COST: u32 = 4;

    fn user_id() -> UserId {
        UserId::new(uuid::Uuid::new_v4())
    }

    fn record(id: UserId, asset: Option<&str>) -> ProfileRecord {
        ProfileRecord {
            id,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar_url: asset.map(|_| "https://blobs.example/alice.webp".to_string()),
            avatar_asset_id: asset.map(AssetId::from),
        }
    }

    #[derive(Clone, Copy)]
    enum CommitOutcome {
        Succeed,
        Conflict,
        Vanished,
        Fault,
    }

    struct MockStore {
        /// None => the user does not exist.
        current: Option<Option<AssetId>>,
        commit: CommitOutcome,
        updates: RwLock<Vec<ProfilePatch>>,
        deleted_users: RwLock<Vec<UserId>>,
    }

    impl MockStore {
        fn with_asset(asset: Option<&str>) -> Self {
            Self {
                current: Some(asset.map(AssetId::from)),
                commit: CommitOutcome::Succeed,
                updates: RwLock::new(Vec::new()),
                deleted_users: RwLock::new(Vec::new()),
            }
        }

        fn missing_user() -> Self {
            Self {
                current: None,
                commit: CommitOutcome::Succeed,
                updates: RwLock::new(Vec::new()),
                deleted_users: RwLock::new(Vec::new()),
            }
        }

        fn failing_commit(asset: Option<&str>, outcome: CommitOutcome) -> Self {
            Self {
                commit: outcome,
                ..Self::with_asset(asset)
            }
        }

        fn recorded_updates(&self) -> Vec<ProfilePatch> {
            self.updates.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProfileStore for MockStore {
        async fn get_profile(&self, user_id: &UserId) -> Result<ProfileRecord, StoreError> {
            match &self.current {
                Some(asset) => Ok(record(*user_id, asset.as_ref().map(AssetId::as_str))),
                None => Err(StoreError::NotFound),
            }
        }

        async fn find_current_asset(
            &self,
            _user_id: &UserId,
        ) -> Result<Option<AssetId>, StoreError> {
            match &self.current {
                Some(asset) => Ok(asset.clone()),
                None => Err(StoreError::NotFound),
            }
        }

        async fn update_profile(
            &self,
            user_id: &UserId,
            patch: &ProfilePatch,
        ) -> Result<ProfileRecord, StoreError> {
            self.updates.write().unwrap().push(patch.clone());

            match self.commit {
                CommitOutcome::Succeed => {
                    let asset_id = patch
                        .avatar
                        .as_ref()
                        .map(|asset| asset.asset_id.as_str().to_string());
                    Ok(record(*user_id, asset_id.as_deref()))
                }
                CommitOutcome::Conflict => Err(StoreError::Conflict(ConflictField::Email)),
                CommitOutcome::Vanished => Err(StoreError::NotFound),
                CommitOutcome::Fault => Err(StoreError::Other("connection reset".to_string())),
            }
        }

        async fn delete_user(&self, user_id: &UserId) -> Result<(), StoreError> {
            if self.current.is_none() {
                return Err(StoreError::NotFound);
            }
            self.deleted_users.write().unwrap().push(*user_id);
            Ok(())
        }
    }

    struct MockBlobStore {
        next_id: String,
        fail_put: bool,
        fail_delete: bool,
        puts: RwLock<Vec<Vec<u8>>>,
        deletes: RwLock<Vec<AssetId>>,
    }

    impl MockBlobStore {
        fn returning(next_id: &str) -> Self {
            Self {
                next_id: next_id.to_string(),
                fail_put: false,
                fail_delete: false,
                puts: RwLock::new(Vec::new()),
                deletes: RwLock::new(Vec::new()),
            }
        }

        fn failing_put() -> Self {
            Self {
                fail_put: true,
                ..Self::returning("unused")
            }
        }

        fn failing_delete(next_id: &str) -> Self {
            Self {
                fail_delete: true,
                ..Self::returning(next_id)
            }
        }

        fn put_count(&self) -> usize {
            self.puts.read().unwrap().len()
        }

        fn deleted_ids(&self) -> Vec<AssetId> {
            self.deletes.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl BlobStore for MockBlobStore {
        async fn put(&self, bytes: &[u8]) -> Result<RemoteAsset, BlobStoreError> {
            if self.fail_put {
                return Err(BlobStoreError::Request("upload timed out".to_string()));
            }
            self.puts.write().unwrap().push(bytes.to_vec());
            Ok(RemoteAsset::new(
                format!("https://blobs.example/{}.webp", self.next_id),
                self.next_id.as_str(),
            ))
        }

        async fn delete(&self, id: &AssetId) -> Result<(), BlobStoreError> {
            self.deletes.write().unwrap().push(id.clone());
            if self.fail_delete {
                return Err(BlobStoreError::Request("delete timed out".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Clone, Copy)]
    enum ProcessorOutcome {
        Accept,
        RejectValidation,
        FailTranscode,
    }

    struct MockProcessor {
        outcome: ProcessorOutcome,
    }

    impl MockProcessor {
        fn accepting() -> Self {
            Self {
                outcome: ProcessorOutcome::Accept,
            }
        }
    }

    impl AvatarProcessor for MockProcessor {
        fn validate(&self, _input: &[u8]) -> Result<(), AvatarProcessingError> {
            match self.outcome {
                ProcessorOutcome::RejectValidation => Err(AvatarProcessingError::Invalid(
                    "not a decodable image".to_string(),
                )),
                _ => Ok(()),
            }
        }

        fn transcode(&self, _input: &[u8]) -> Result<SanitizedAvatar, AvatarProcessingError> {
            match self.outcome {
                ProcessorOutcome::FailTranscode => Err(AvatarProcessingError::Transcode(
                    "zero-dimension image".to_string(),
                )),
                _ => Ok(SanitizedAvatar::new(vec![0xAB; 16], 512, 512)),
            }
        }
    }

    fn service(
        store: MockStore,
        blob_store: MockBlobStore,
        processor: MockProcessor,
    ) -> (
        ProfileServiceImpl<MockStore, MockBlobStore, MockProcessor>,
        Arc<MockStore>,
        Arc<MockBlobStore>,
    ) {
        let store = Arc::new(store);
        let blob_store = Arc::new(blob_store);
        let service = ProfileServiceImpl::new(
            Arc::clone(&store),
            Arc::clone(&blob_store),
            Arc::new(processor),
            DefaultAvatars::new(["avatars/default"]),
            TEST_BCRYPT_COST,
        );
        (service, store, blob_store)
    }

    fn upload() -> UploadCandidate {
        UploadCandidate::new(
            vec![0xFF, 0xD8, 0xFF, 0xE0],
            Some("image/jpeg".to_string()),
            Some("me.jpg".to_string()),
        )
    }

    fn request_with_image() -> UpdateProfileRequest {
        UpdateProfileRequest {
            image: Some(upload()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_request_is_rejected_without_side_effects() {
        let (service, store, blobs) = service(
            MockStore::with_asset(None),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let err = service
            .update_profile(&user_id(), UpdateProfileRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::NothingToUpdate));
        assert!(store.recorded_updates().is_empty());
        assert_eq!(blobs.put_count(), 0);
        assert!(blobs.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn missing_user_fails_before_any_mutation() {
        let (service, store, blobs) = service(
            MockStore::missing_user(),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::UserNotFound));
        assert!(store.recorded_updates().is_empty());
        assert_eq!(blobs.put_count(), 0);
    }

    #[tokio::test]
    async fn rejected_image_never_reaches_the_blob_store() {
        let (service, store, blobs) = service(
            MockStore::with_asset(None),
            MockBlobStore::returning("avatars/new"),
            MockProcessor {
                outcome: ProcessorOutcome::RejectValidation,
            },
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::InvalidImage(_)));
        assert_eq!(blobs.put_count(), 0);
        assert!(store.recorded_updates().is_empty());
    }

    #[tokio::test]
    async fn transcode_failure_aborts_before_upload() {
        let (service, store, blobs) = service(
            MockStore::with_asset(None),
            MockBlobStore::returning("avatars/new"),
            MockProcessor {
                outcome: ProcessorOutcome::FailTranscode,
            },
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::Processing(_)));
        assert_eq!(blobs.put_count(), 0);
        assert!(store.recorded_updates().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_aborts_without_touching_the_store() {
        let (service, store, blobs) = service(
            MockStore::with_asset(Some("avatars/old")),
            MockBlobStore::failing_put(),
            MockProcessor::accepting(),
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::Upload(_)));
        assert!(store.recorded_updates().is_empty());
        assert!(blobs.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn conflicting_commit_rolls_back_the_new_upload_only() {
        let (service, _store, blobs) = service(
            MockStore::failing_commit(Some("avatars/old"), CommitOutcome::Conflict),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::Conflict(ConflictField::Email)));
        assert_eq!(blobs.deleted_ids(), vec![AssetId::from("avatars/new")]);
    }

    #[tokio::test]
    async fn vanished_user_at_commit_rolls_back_the_new_upload() {
        let (service, _store, blobs) = service(
            MockStore::failing_commit(Some("avatars/old"), CommitOutcome::Vanished),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::UserNotFound));
        assert_eq!(blobs.deleted_ids(), vec![AssetId::from("avatars/new")]);
    }

    #[tokio::test]
    async fn persistence_fault_rolls_back_and_surfaces_generic_error() {
        let (service, _store, blobs) = service(
            MockStore::failing_commit(None, CommitOutcome::Fault),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::Persistence(_)));
        assert_eq!(blobs.deleted_ids(), vec![AssetId::from("avatars/new")]);
    }

    #[tokio::test]
    async fn failed_rollback_still_surfaces_the_commit_error() {
        let (service, _store, blobs) = service(
            MockStore::failing_commit(Some("avatars/old"), CommitOutcome::Conflict),
            MockBlobStore::failing_delete("avatars/new"),
            MockProcessor::accepting(),
        );

        let err = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::Conflict(_)));
        assert_eq!(blobs.deleted_ids(), vec![AssetId::from("avatars/new")]);
    }

    #[tokio::test]
    async fn successful_commit_deletes_the_replaced_asset() {
        let (service, _store, blobs) = service(
            MockStore::with_asset(Some("avatars/old")),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let response = service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap();

        assert!(response.avatar.is_some());
        assert_eq!(blobs.put_count(), 1);
        assert_eq!(blobs.deleted_ids(), vec![AssetId::from("avatars/old")]);
    }

    #[tokio::test]
    async fn no_previous_asset_means_no_cleanup() {
        let (service, _store, blobs) = service(
            MockStore::with_asset(None),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap();

        assert!(blobs.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn default_asset_is_never_deleted() {
        let (service, _store, blobs) = service(
            MockStore::with_asset(Some("avatars/default")),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap();

        assert_eq!(blobs.put_count(), 1);
        assert!(blobs.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn unchanged_asset_id_is_not_deleted() {
        let (service, _store, blobs) = service(
            MockStore::with_asset(Some("avatars/same")),
            MockBlobStore::returning("avatars/same"),
            MockProcessor::accepting(),
        );

        service
            .update_profile(&user_id(), request_with_image())
            .await
            .unwrap();

        assert!(blobs.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn failed_cleanup_does_not_fail_the_request() {
        let (service, _store, blobs) = service(
            MockStore::with_asset(Some("avatars/old")),
            MockBlobStore::failing_delete("avatars/new"),
            MockProcessor::accepting(),
        );

        let response = service
            .update_profile(&user_id(), request_with_image())
            .await;

        assert!(response.is_ok());
        assert_eq!(blobs.deleted_ids(), vec![AssetId::from("avatars/old")]);
    }

    #[tokio::test]
    async fn text_only_update_skips_the_blob_store_entirely() {
        let (service, store, blobs) = service(
            MockStore::with_asset(Some("avatars/old")),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let request = UpdateProfileRequest {
            username: Some("bob".to_string()),
            ..Default::default()
        };
        service.update_profile(&user_id(), request).await.unwrap();

        assert_eq!(blobs.put_count(), 0);
        assert!(blobs.deleted_ids().is_empty());

        let updates = store.recorded_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].username.as_deref(), Some("bob"));
        assert!(updates[0].avatar.is_none());
    }

    #[tokio::test]
    async fn password_is_hashed_before_it_reaches_the_store() {
        let (service, store, _blobs) = service(
            MockStore::with_asset(None),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let request = UpdateProfileRequest {
            password: Some("hunter2hunter2".to_string()),
            ..Default::default()
        };
        service.update_profile(&user_id(), request).await.unwrap();

        let updates = store.recorded_updates();
        let hash = updates[0].password_hash.as_deref().unwrap();
        assert_ne!(hash, "hunter2hunter2");
        assert!(bcrypt::verify("hunter2hunter2", hash).unwrap());
    }

    #[tokio::test]
    async fn delete_account_leaves_the_blob_store_alone() {
        let (service, store, blobs) = service(
            MockStore::with_asset(Some("avatars/old")),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );
        let id = user_id();

        service.delete_account(&id).await.unwrap();

        assert_eq!(store.deleted_users.read().unwrap().clone(), vec![id]);
        assert_eq!(blobs.put_count(), 0);
        assert!(blobs.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn deleting_an_absent_account_reports_not_found() {
        let (service, _store, _blobs) = service(
            MockStore::missing_user(),
            MockBlobStore::returning("avatars/new"),
            MockProcessor::accepting(),
        );

        let err = service.delete_account(&user_id()).await.unwrap_err();

        assert!(matches!(err, ProfileError::UserNotFound));
    }
}
