#[cfg(test)]
mod tests {
    use crate::test_support::{build_encrypted_zip, build_zip, BrokenArchive, MemoryArchive};
    use crate::ArchiveComparator;
    use std::fs;
    use std::io::Cursor;
    use zcompare_common::{
        ArchiveSide, CompareError, CompareOptions, Credentials, EntryComparison, ExclusionSet,
        HashAlgorithm,
    };

    fn compare_in_memory(
        first: Vec<u8>,
        second: Vec<u8>,
        credentials: &Credentials,
        exclusions: &ExclusionSet,
    ) -> Result<zcompare_common::ComparisonResult, CompareError> {
        ArchiveComparator::default().compare_readers(
            Cursor::new(first),
            Cursor::new(second),
            credentials,
            exclusions,
        )
    }

    fn password(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    // ============================================================================
    // Entry classification
    // ============================================================================

    #[test]
    fn test_mixed_archives_with_log_exclusion() {
        let first = build_zip(&[("a.txt", "hi"), ("b.log", "x")]);
        let second = build_zip(&[("a.txt", "hi"), ("c.log", "y")]);

        let result = compare_in_memory(
            first,
            second,
            &Credentials::none(),
            &ExclusionSet::from_list([".log"]),
        )
        .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(
            result.get("a.txt"),
            Some(&EntryComparison {
                in_first: true,
                in_second: true,
                identical: true,
                size_first: Some("2.00 B".to_string()),
                size_second: Some("2.00 B".to_string()),
            })
        );
    }

    #[test]
    fn test_entries_in_one_archive_only() {
        let first = build_zip(&[("only_first.txt", "left"), ("shared.txt", "same")]);
        let second = build_zip(&[("shared.txt", "same"), ("only_second.bin", "right side")]);

        let result =
            compare_in_memory(first, second, &Credentials::none(), &ExclusionSet::new()).unwrap();

        assert_eq!(result.len(), 3);

        let left = result.get("only_first.txt").unwrap();
        assert!(left.in_first && !left.in_second && !left.identical);
        assert_eq!(left.size_first.as_deref(), Some("4.00 B"));
        assert!(left.size_second.is_none());

        let right = result.get("only_second.bin").unwrap();
        assert!(!right.in_first && right.in_second && !right.identical);
        assert!(right.size_first.is_none());
        assert_eq!(right.size_second.as_deref(), Some("10.00 B"));

        assert!(result.get("shared.txt").unwrap().identical);
    }

    #[test]
    fn test_same_size_different_content() {
        let first = build_zip(&[("config.ini", "mode=a")]);
        let second = build_zip(&[("config.ini", "mode=b")]);

        let result =
            compare_in_memory(first, second, &Credentials::none(), &ExclusionSet::new()).unwrap();

        let record = result.get("config.ini").unwrap();
        assert!(record.in_first && record.in_second);
        assert!(!record.identical);
        assert_eq!(record.size_first, record.size_second);
    }

    #[test]
    fn test_different_sizes_never_read_contents() {
        let mut first = MemoryArchive::new(ArchiveSide::First, &[("data.csv", "1,2,3")]);
        let mut second = MemoryArchive::new(ArchiveSide::Second, &[("data.csv", "1,2,3,4")]);

        let result = ArchiveComparator::default()
            .compare(&mut first, &mut second, None, None, &ExclusionSet::new())
            .unwrap();

        let record = result.get("data.csv").unwrap();
        assert!(!record.identical);
        assert_eq!(record.size_first.as_deref(), Some("5.00 B"));
        assert_eq!(record.size_second.as_deref(), Some("7.00 B"));
        assert!(first.opened.is_empty());
        assert!(second.opened.is_empty());
    }

    #[test]
    fn test_equal_sizes_read_both_sides() {
        let mut first = MemoryArchive::new(ArchiveSide::First, &[("a.txt", "abc")]);
        let mut second =
            MemoryArchive::new(ArchiveSide::Second, &[("a.txt", "abcdef")]).with_reported_size("a.txt", 3);

        let result = ArchiveComparator::default()
            .compare(&mut first, &mut second, None, None, &ExclusionSet::new())
            .unwrap();

        assert!(!result.get("a.txt").unwrap().identical);
        assert_eq!(first.opened, vec!["a.txt".to_string()]);
        assert_eq!(second.opened, vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_directory_entries_compare_as_empty() {
        let build = || {
            let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
            let options = zip::write::FileOptions::default();
            zip.add_directory("docs/", options).unwrap();
            zip.start_file("docs/readme.md", options).unwrap();
            std::io::Write::write_all(&mut zip, b"# readme").unwrap();
            zip.finish().unwrap().into_inner()
        };

        let result =
            compare_in_memory(build(), build(), &Credentials::none(), &ExclusionSet::new()).unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.get("docs/").unwrap().identical);
        assert!(result.get("docs/readme.md").unwrap().identical);
    }

    // ============================================================================
    // Exclusions
    // ============================================================================

    #[test]
    fn test_exclusion_is_case_insensitive_on_both_sides() {
        let first = build_zip(&[("Build.LOG", "x"), ("keep.txt", "k"), ("trace.Log", "t")]);
        let second = build_zip(&[("Build.LOG", "x"), ("keep.txt", "k"), ("other.log", "o")]);

        let result = compare_in_memory(
            first,
            second,
            &Credentials::none(),
            &ExclusionSet::from_list([".log"]),
        )
        .unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains("keep.txt"));
        assert!(!result.contains("Build.LOG"));
        assert!(!result.contains("trace.Log"));
        assert!(!result.contains("other.log"));
    }

    #[test]
    fn test_names_without_extension_only_excluded_by_dot() {
        let first = build_zip(&[("Makefile", "all:"), ("src/.env", "A=1"), ("main.rs", "fn")]);
        let second = build_zip(&[("Makefile", "all:"), ("src/.env", "A=1"), ("main.rs", "fn")]);

        let kept = compare_in_memory(
            first.clone(),
            second.clone(),
            &Credentials::none(),
            &ExclusionSet::from_list([".rs"]),
        )
        .unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept.contains("Makefile"));
        assert!(kept.contains("src/.env"));

        let dropped = compare_in_memory(
            first,
            second,
            &Credentials::none(),
            &ExclusionSet::from_list(["."]),
        )
        .unwrap();
        assert_eq!(dropped.len(), 1);
        assert!(dropped.contains("main.rs"));
    }

    #[test]
    fn test_self_comparison_and_full_exclusion() {
        let archive = build_zip(&[("a.txt", "alpha"), ("b.md", "beta"), ("c/d.json", "{}")]);

        let result = compare_in_memory(
            archive.clone(),
            archive.clone(),
            &Credentials::none(),
            &ExclusionSet::new(),
        )
        .unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|(_, record)| record.identical));
        assert!(result.summary().all_identical());

        let result = compare_in_memory(
            archive.clone(),
            archive,
            &Credentials::none(),
            &ExclusionSet::from_csv(".txt, .MD, json"),
        )
        .unwrap();
        assert!(result.is_empty());
    }

    // ============================================================================
    // Preconditions
    // ============================================================================

    #[test]
    fn test_invalid_archive() {
        let err = compare_in_memory(
            build_zip(&[("a.txt", "a")]),
            b"PK\x03\x04 but not really".to_vec(),
            &Credentials::none(),
            &ExclusionSet::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CompareError::InvalidArchive { side: ArchiveSide::Second, .. }
        ));
    }

    #[test]
    fn test_size_limit_regardless_of_entry_count() {
        let archive = build_zip(&[("one.txt", "1")]);
        let limit = archive.len() as u64 - 1;
        let comparator = ArchiveComparator::new(CompareOptions::default().with_max_archive_size(limit));

        let err = comparator
            .compare_readers(
                Cursor::new(archive.clone()),
                Cursor::new(archive),
                &Credentials::none(),
                &ExclusionSet::new(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            CompareError::SizeLimitExceeded { side: ArchiveSide::First, .. }
        ));
    }

    #[test]
    fn test_size_limit_message_uses_configured_megabytes() {
        let big = vec![0u8; 2 * 1024 * 1024 + 1];
        let comparator = ArchiveComparator::new(CompareOptions::default().with_max_archive_size_mb(2));

        let err = comparator
            .compare_readers(
                Cursor::new(build_zip(&[("a.txt", "a")])),
                Cursor::new(big),
                &Credentials::none(),
                &ExclusionSet::new(),
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "One or both ZIP files exceeds 2MB limit");
    }

    // ============================================================================
    // Encrypted archives
    // ============================================================================

    #[test]
    fn test_encrypted_without_password() {
        let encrypted = build_encrypted_zip(&[("secret.txt", "classified")], "s3cret");
        let plain = build_zip(&[("secret.txt", "classified")]);

        let err = compare_in_memory(
            plain.clone(),
            encrypted.clone(),
            &Credentials::none(),
            &ExclusionSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CompareError::MissingPassword(ArchiveSide::Second)));

        let err = compare_in_memory(
            encrypted,
            plain,
            &Credentials::new(Some(String::new()), None),
            &ExclusionSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CompareError::MissingPassword(ArchiveSide::First)));
    }

    #[test]
    fn test_encrypted_with_wrong_password() {
        let encrypted = build_encrypted_zip(&[("secret.txt", "classified")], "s3cret");
        let plain = build_zip(&[("secret.txt", "classified")]);

        let err = compare_in_memory(
            encrypted,
            plain,
            &Credentials::new(password("guess"), None),
            &ExclusionSet::new(),
        )
        .unwrap_err();

        assert!(matches!(err, CompareError::IncorrectPassword(ArchiveSide::First)));
    }

    #[test]
    fn test_encrypted_with_correct_password() {
        let encrypted = build_encrypted_zip(
            &[("secret.txt", "classified"), ("notes.md", "draft 1")],
            "s3cret",
        );
        let plain = build_zip(&[("secret.txt", "classified"), ("notes.md", "draft 2")]);

        let result = compare_in_memory(
            encrypted,
            plain,
            &Credentials::new(password("s3cret"), None),
            &ExclusionSet::new(),
        )
        .unwrap();

        assert!(result.get("secret.txt").unwrap().identical);
        assert!(!result.get("notes.md").unwrap().identical);
    }

    #[test]
    fn test_both_encrypted_with_different_passwords() {
        let first = build_encrypted_zip(&[("k.pem", "-----KEY-----")], "alpha");
        let second = build_encrypted_zip(&[("k.pem", "-----KEY-----")], "beta");

        let result = compare_in_memory(
            first,
            second,
            &Credentials::new(password("alpha"), password("beta")),
            &ExclusionSet::new(),
        )
        .unwrap();

        assert!(result.get("k.pem").unwrap().identical);
    }

    #[test]
    fn test_missing_password_reported_before_wrong_password() {
        let first = build_encrypted_zip(&[("a.txt", "a")], "alpha");
        let second = build_encrypted_zip(&[("a.txt", "a")], "beta");

        let err = compare_in_memory(
            first,
            second,
            &Credentials::new(password("wrong"), None),
            &ExclusionSet::new(),
        )
        .unwrap_err();

        assert!(matches!(err, CompareError::MissingPassword(ArchiveSide::Second)));
    }

    #[test]
    fn test_wrong_password_detected_while_reading() {
        let mut first = MemoryArchive::new(ArchiveSide::First, &[("a.txt", "abc")]).with_password("right");
        let mut second = MemoryArchive::new(ArchiveSide::Second, &[("a.txt", "abc")]);

        let err = ArchiveComparator::default()
            .compare(
                &mut first,
                &mut second,
                Some(b"wrong".as_slice()),
                None,
                &ExclusionSet::new(),
            )
            .unwrap_err();

        assert!(matches!(err, CompareError::IncorrectPassword(ArchiveSide::First)));
    }

    #[test]
    fn test_wrong_password_unnoticed_when_nothing_is_read() {
        let mut first = MemoryArchive::new(ArchiveSide::First, &[("a.txt", "abc")]).with_password("right");
        let mut second = MemoryArchive::new(ArchiveSide::Second, &[("a.txt", "abcd")]);

        let result = ArchiveComparator::default()
            .compare(
                &mut first,
                &mut second,
                Some(b"wrong".as_slice()),
                None,
                &ExclusionSet::new(),
            )
            .unwrap();

        assert!(!result.get("a.txt").unwrap().identical);
    }

    // ============================================================================
    // Failure handling and options
    // ============================================================================

    #[test]
    fn test_read_error_aborts_comparison() {
        let mut first = BrokenArchive;
        let mut second = MemoryArchive::new(ArchiveSide::Second, &[("broken.bin", "abcd"), ("z.txt", "z")]);

        let err = ArchiveComparator::default()
            .compare(&mut first, &mut second, None, None, &ExclusionSet::new())
            .unwrap_err();

        match err {
            CompareError::Read(message) => assert!(message.contains("broken.bin")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blake3_gives_same_verdicts() {
        let first = build_zip(&[("a.txt", "same"), ("b.txt", "left")]);
        let second = build_zip(&[("a.txt", "same"), ("b.txt", "rite")]);
        let comparator =
            ArchiveComparator::new(CompareOptions::default().with_hash_algorithm(HashAlgorithm::Blake3));

        let result = comparator
            .compare_readers(
                Cursor::new(first),
                Cursor::new(second),
                &Credentials::none(),
                &ExclusionSet::new(),
            )
            .unwrap();

        assert!(result.get("a.txt").unwrap().identical);
        assert!(!result.get("b.txt").unwrap().identical);
    }

    #[test]
    fn test_compare_paths_builds_report() {
        let temp = tempfile::TempDir::new().unwrap();
        let first_path = temp.path().join("release-1.zip");
        let second_path = temp.path().join("release-2.zip");
        fs::write(&first_path, build_zip(&[("app.bin", "v1"), ("debug.LOG", "1")])).unwrap();
        fs::write(&second_path, build_zip(&[("app.bin", "v2"), ("debug.log", "2")])).unwrap();

        let report = ArchiveComparator::default()
            .compare_paths(
                &first_path,
                &second_path,
                &Credentials::none(),
                &ExclusionSet::from_csv("LOG"),
            )
            .unwrap();

        assert_eq!(report.first_name, "release-1.zip");
        assert_eq!(report.second_name, "release-2.zip");
        assert_eq!(report.exclude_list, vec![".log".to_string()]);
        assert_eq!(report.comparison.len(), 1);
        assert!(!report.comparison.get("app.bin").unwrap().identical);
    }

    #[test]
    fn test_compare_bytes_report_echoes_normalized_exclusions() {
        let first = build_zip(&[("a.txt", "hi"), ("b.log", "x"), ("notes.TMP", "1")]);
        let second = build_zip(&[("a.txt", "hi"), ("c.log", "y")]);

        let report = ArchiveComparator::default()
            .compare_bytes(
                first,
                second,
                "upload-a.zip",
                "upload-b.zip",
                &Credentials::none(),
                &ExclusionSet::from_list(["LOG", " .tmp ", ""]),
            )
            .unwrap();

        assert_eq!(report.first_name, "upload-a.zip");
        assert_eq!(report.second_name, "upload-b.zip");
        assert_eq!(report.exclude_list, vec![".log".to_string(), ".tmp".to_string()]);
        assert_eq!(report.comparison.len(), 1);
        assert!(report.comparison.get("a.txt").unwrap().identical);
    }

    #[test]
    fn test_compare_bytes_applies_size_limit() {
        let options = CompareOptions::default().with_max_archive_size(16);
        let err = ArchiveComparator::new(options)
            .compare_bytes(
                build_zip(&[("a.txt", "hi")]),
                build_zip(&[("a.txt", "hi")]),
                "a.zip",
                "b.zip",
                &Credentials::none(),
                &ExclusionSet::new(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            CompareError::SizeLimitExceeded { side: ArchiveSide::First, .. }
        ));
    }
}
