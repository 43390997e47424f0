mod helpers;

#[cfg(test)]
mod tests {
    use super::helpers::{sample_bytes, FailingRepository, FlakyStore};
    use chrono::Utc;
    use std::sync::Mutex;
    use tokio::time::{Duration, Instant};
    use video_portal::chunk::{part_key, ChunkPolicy};
    use video_portal::fetch::{ChunkedFetcher, FetchProgress};
    use video_portal::upload::{ChunkedUploader, UploadFile, UploadRequest};
    use video_portal::{ErrorKind, NewVideo, PortalError, VideoId, VideoRecord};

    fn single_record(key: &str, size: u64) -> VideoRecord {
        VideoRecord::from_new(
            VideoId::new(),
            Utc::now(),
            NewVideo {
                owner_id: "alice".to_string(),
                title: "clip".to_string(),
                file_path: key.to_string(),
                is_chunked: false,
                chunk_count: None,
                chunk_paths: None,
                file_size: size,
                downloadable: true,
            },
        )
    }

    fn chunked_record(base: &str, parts: usize, size: u64) -> VideoRecord {
        let paths: Vec<String> = (0..parts).map(|i| part_key(base, i)).collect();
        VideoRecord::from_new(
            VideoId::new(),
            Utc::now(),
            NewVideo {
                owner_id: "alice".to_string(),
                title: "course".to_string(),
                file_path: base.to_string(),
                is_chunked: true,
                chunk_count: Some(parts as u32),
                chunk_paths: Some(paths),
                file_size: size,
                downloadable: true,
            },
        )
    }

    async fn seed_parts(store: &FlakyStore, base: &str, data: &[u8], part_size: usize) -> usize {
        let mut count = 0;
        for (index, part) in data.chunks(part_size).enumerate() {
            store.seed(&part_key(base, index), part).await;
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn chunked_upload_round_trips_byte_for_byte() {
        let store = FlakyStore::new();
        let repo = FailingRepository::new();
        let data = sample_bytes(10_000);

        let video = ChunkedUploader::new(store.clone(), repo.clone(), ChunkPolicy::new(1024, 999).unwrap())
            .upload(UploadFile::new("course.mp4", data.clone()), UploadRequest::new("alice"))
            .await
            .unwrap();
        assert_eq!(video.chunk_count, Some(11));

        let blob = ChunkedFetcher::new(store.clone()).fetch(&video).await.unwrap();

        assert_eq!(blob.len() as u64, video.file_size);
        assert_eq!(blob.data, data);
        assert_eq!(blob.content_type, "video/mp4");
    }

    #[tokio::test]
    async fn single_upload_round_trips() {
        let store = FlakyStore::new();
        let repo = FailingRepository::new();
        let data = sample_bytes(500);

        let video = ChunkedUploader::new(store.clone(), repo.clone(), ChunkPolicy::default())
            .upload(UploadFile::new("clip.mp4", data.clone()), UploadRequest::new("alice"))
            .await
            .unwrap();
        let blob = ChunkedFetcher::new(store.clone()).fetch(&video).await.unwrap();

        assert_eq!(blob.data, data);
    }

    #[tokio::test]
    async fn every_fetch_downloads_again() {
        let store = FlakyStore::new();
        let data = sample_bytes(300);
        let parts = seed_parts(&store, "base.mp4", &data, 100).await;
        let video = chunked_record("base.mp4", parts, 300);
        let fetcher = ChunkedFetcher::new(store.clone());

        fetcher.fetch(&video).await.unwrap();
        fetcher.fetch(&video).await.unwrap();

        assert_eq!(store.download_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn single_object_gives_up_after_three_attempts() {
        let store = FlakyStore::new();
        store.seed("clip.mp4", b"frames").await;
        store.fail_all_downloads();
        let attempts_at: Mutex<Vec<(u32, Instant)>> = Mutex::new(Vec::new());

        let start = Instant::now();
        let err = ChunkedFetcher::new(store.clone())
            .fetch_with_progress(&single_record("clip.mp4", 6), &|p: &FetchProgress| {
                attempts_at.lock().unwrap().push((p.attempt, Instant::now()));
            })
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(store.download_count(), 3);
        assert!(matches!(err, PortalError::RetriesExhausted { attempts: 3, .. }));
        assert!(err.to_string().contains("3 attempts"), "unexpected message: {}", err);
        assert_eq!(err.kind(), ErrorKind::StorageRead);

        let attempts_at = attempts_at.into_inner().unwrap();
        let numbers: Vec<u32> = attempts_at.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let first_gap = attempts_at[1].1 - attempts_at[0].1;
        let second_gap = attempts_at[2].1 - attempts_at[1].1;
        assert!(first_gap >= Duration::from_millis(1000) && first_gap < Duration::from_millis(1100));
        assert!(second_gap >= Duration::from_millis(2000) && second_gap < Duration::from_millis(2100));
        assert!(elapsed >= Duration::from_millis(3000) && elapsed < Duration::from_millis(3200));
    }

    #[tokio::test(start_paused = true)]
    async fn single_object_recovers_on_a_later_attempt() {
        let store = FlakyStore::new();
        store.seed("clip.mp4", b"frames").await;
        store.fail_downloads_of("clip.mp4", 2);
        let seen: Mutex<Vec<(f32, u32)>> = Mutex::new(Vec::new());

        let blob = ChunkedFetcher::new(store.clone())
            .fetch_with_progress(&single_record("clip.mp4", 6), &|p: &FetchProgress| {
                seen.lock().unwrap().push((p.percent, p.attempt))
            })
            .await
            .unwrap();

        assert_eq!(blob.data, b"frames");
        assert_eq!(store.download_count(), 3);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![(20.0, 1), (40.0, 2), (60.0, 3), (80.0, 3), (100.0, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_object_counts_as_a_failed_read() {
        let store = FlakyStore::new();
        store.seed("clip.mp4", b"").await;

        let err = ChunkedFetcher::new(store.clone())
            .fetch(&single_record("clip.mp4", 0))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageRead);
        assert!(err.to_string().contains("no data"));
        assert_eq!(store.download_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn chunked_retry_restarts_from_the_first_part() {
        let store = FlakyStore::new();
        let data = sample_bytes(400);
        let parts = seed_parts(&store, "base.mp4", &data, 100).await;
        store.fail_downloads_of(&part_key("base.mp4", 2), 1);

        let start = Instant::now();
        let blob = ChunkedFetcher::new(store.clone())
            .fetch(&chunked_record("base.mp4", parts, 400))
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(blob.data, data);
        let expected: Vec<String> = [0, 1, 2, 0, 1, 2, 3]
            .iter()
            .map(|i| part_key("base.mp4", *i))
            .collect();
        assert_eq!(store.downloads(), expected);
        assert!(elapsed >= Duration::from_millis(2000) && elapsed < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn chunked_fetch_gives_up_after_two_attempts() {
        let store = FlakyStore::new();
        let data = sample_bytes(300);
        let parts = seed_parts(&store, "base.mp4", &data, 100).await;
        store.fail_downloads_of(&part_key("base.mp4", 1), 5);

        let err = ChunkedFetcher::new(store.clone())
            .fetch(&chunked_record("base.mp4", parts, 300))
            .await
            .unwrap_err();

        assert!(matches!(err, PortalError::RetriesExhausted { attempts: 2, .. }));
        assert!(err.to_string().contains("part 2/3"), "unexpected message: {}", err);
        // Each attempt stops at the failing part.
        assert_eq!(store.download_count(), 4);
    }

    #[tokio::test]
    async fn chunked_progress_climbs_to_ninety_then_completes() {
        let store = FlakyStore::new();
        let data = sample_bytes(300);
        let parts = seed_parts(&store, "base.mp4", &data, 100).await;
        let seen: Mutex<Vec<FetchProgress>> = Mutex::new(Vec::new());

        ChunkedFetcher::new(store.clone())
            .fetch_with_progress(&chunked_record("base.mp4", parts, 300), &|p: &FetchProgress| {
                seen.lock().unwrap().push(p.clone())
            })
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        let percents: Vec<f32> = seen.iter().map(|p| p.percent.round()).collect();
        assert_eq!(percents, vec![30.0, 60.0, 90.0, 100.0]);
        assert_eq!(seen[1].parts, Some((2, 3)));
        assert!(seen.iter().all(|p| p.attempt == 1));
    }

    #[tokio::test]
    async fn count_mismatch_still_fetches_the_listed_parts() {
        let store = FlakyStore::new();
        let data = sample_bytes(300);
        let parts = seed_parts(&store, "base.mp4", &data, 100).await;
        let mut video = chunked_record("base.mp4", parts, 300);
        let fetcher = ChunkedFetcher::new(store.clone());

        video.chunk_count = Some(4);
        assert_eq!(fetcher.fetch(&video).await.unwrap().data, data);

        video.chunk_count = None;
        assert_eq!(fetcher.fetch(&video).await.unwrap().data, data);

        assert_eq!(store.download_count(), 6);
    }

    #[tokio::test]
    async fn empty_manifest_falls_back_to_the_whole_file() {
        let store = FlakyStore::new();
        store.seed("base.mp4", b"whole file").await;
        let mut video = chunked_record("base.mp4", 0, 10);

        let blob = ChunkedFetcher::new(store.clone()).fetch(&video).await.unwrap();
        assert_eq!(blob.data, b"whole file");
        assert_eq!(store.downloads(), vec!["base.mp4".to_string()]);

        video.chunk_paths = None;
        video.chunk_count = None;
        assert!(ChunkedFetcher::new(store.clone()).fetch(&video).await.is_ok());
    }

    #[tokio::test]
    async fn custom_retry_configs_are_used() {
        use video_portal::storage::retry::{Backoff, RetryConfig};

        let store = FlakyStore::new();
        store.fail_all_downloads();
        let quick = RetryConfig::new(
            5,
            Backoff::Linear {
                step: Duration::from_millis(1),
                max: Duration::from_millis(1),
            },
        );
        let fetcher = ChunkedFetcher::new(store.clone()).with_retry_configs(quick, quick);

        let err = fetcher.fetch(&single_record("clip.mp4", 1)).await.unwrap_err();
        assert!(matches!(err, PortalError::RetriesExhausted { attempts: 5, .. }));
        assert_eq!(store.download_count(), 5);
    }
}
