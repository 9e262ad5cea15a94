use anyhow::Result;
use social_graph::app::commands::sample_graph;
use social_graph::{Format, LocalStorage, RefTarget, Serializer, SocialError, SocialGraph};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn serializer(temp_dir: &TempDir) -> Serializer<LocalStorage> {
    Serializer::new(LocalStorage::new(temp_dir.path()))
}

fn as_set(ids: &[u64]) -> BTreeSet<u64> {
    ids.iter().copied().collect()
}

/// 比對兩張圖的欄位值與關聯集合
fn assert_same_graph(original: &SocialGraph, reloaded: &SocialGraph) {
    assert_eq!(original.stats(), reloaded.stats());

    for user in original.users() {
        let other = reloaded.get_user(user.id()).unwrap();
        assert_eq!(user.username(), other.username());
        assert_eq!(user.email(), other.email());
        assert_eq!(user.registered_at(), other.registered_at());
        assert_eq!(as_set(user.posts()), as_set(other.posts()));
        assert_eq!(as_set(user.comments()), as_set(other.comments()));
    }
    for post in original.posts() {
        let other = reloaded.get_post(post.id()).unwrap();
        assert_eq!(post.author_id(), other.author_id());
        assert_eq!(post.text(), other.text());
        assert_eq!(post.created_at(), other.created_at());
        assert_eq!(as_set(post.comments()), as_set(other.comments()));
    }
    for comment in original.comments() {
        let other = reloaded.get_comment(comment.id()).unwrap();
        assert_eq!(comment.author_id(), other.author_id());
        assert_eq!(comment.post_id(), other.post_id());
        assert_eq!(comment.text(), other.text());
        assert_eq!(comment.created_at(), other.created_at());
    }
}

#[test]
fn test_concrete_scenario_survives_json_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let serializer = serializer(&temp_dir);
    let graph = sample_graph()?;

    serializer.export_json(&graph, "social_network.json")?;
    let report = serializer.import_json("social_network.json")?;
    assert!(report.is_clean());

    let reloaded = &report.graph;
    let stats = reloaded.stats();
    assert_eq!((stats.users, stats.posts, stats.comments), (2, 2, 2));
    assert_eq!(reloaded.get_user(1)?.posts(), &[101]);
    assert_eq!(reloaded.get_post(101)?.comments(), &[1001]);
    assert_eq!(reloaded.get_user(2)?.friends(), &[1]);
    assert_same_graph(&graph, reloaded);
    Ok(())
}

#[test]
fn test_larger_graph_round_trips_in_both_formats() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let serializer = serializer(&temp_dir);

    let mut graph = SocialGraph::new();
    for id in 1..=12u64 {
        graph.add_user(id, format!("user{}", id), format!("user{}@example.com", id))?;
    }
    for id in 1..=30u64 {
        graph.add_post(100 + id, (id % 12) + 1, format!("post number {}", id))?;
    }
    for id in 1..=80u64 {
        let author = (id * 7 % 12) + 1;
        let post = 100 + (id * 3 % 30) + 1;
        graph.add_comment(1000 + id, author, post, format!("comment {} — ok", id))?;
    }
    assert!(graph.dangling_references().is_empty());

    for (format, file) in [(Format::Json, "big.json"), (Format::Xml, "big.xml")] {
        serializer.export(&graph, format, file)?;
        let report = serializer.import(format, file)?;
        assert!(report.is_clean(), "{} load was not clean", format);
        assert_same_graph(&graph, &report.graph);
        assert!(report.graph.dangling_references().is_empty());
    }
    Ok(())
}

#[test]
fn test_exported_json_is_readable_utf8() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let serializer = serializer(&temp_dir);

    let mut graph = SocialGraph::new();
    graph.add_user(1, "Иван", "ivan@example.com")?;
    graph.add_post(101, 1, "Привет, мир")?;
    serializer.export_json(&graph, "ru.json")?;

    let text = std::fs::read_to_string(temp_dir.path().join("ru.json"))?;
    assert!(text.contains("\"username\": \"Иван\""));
    assert!(text.contains("\"text\": \"Привет, мир\""));
    assert!(text.contains("\"data_registration\""));
    assert!(text.contains("\"posts\": [\n                101\n            ]"));
    Ok(())
}

#[test]
fn test_forward_references_in_hand_written_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    // 使用者先出現並參照尚未建立、id 較大的貼文與留言
    let json = r#"{
    "users": {
        "2": {"user_id": 2, "username": "maria", "email": "maria@example.com",
              "data_registration": "2024-02-01T08:00:00", "posts": [], "comments": [5000]},
        "1": {"user_id": 1, "username": "ivan", "email": "ivan@example.com",
              "data_registration": "2024-02-01T08:00:00.5", "posts": [900, 800], "comments": []}
    },
    "comments": {
        "5000": {"comment_id": 5000, "user_id": 2, "post_id": 900, "text": "first!",
                 "created_at": "2024-02-01T09:00:00"}
    },
    "posts": {
        "900": {"post_id": 900, "user_id": 1, "text": "later post",
                "created_at": "2024-02-01T08:30:00", "comments": [5000]},
        "800": {"post_id": 800, "user_id": 1, "text": "earlier post",
                "created_at": "2024-02-01T08:20:00", "comments": []}
    }
}"#;
    std::fs::write(temp_dir.path().join("forward.json"), json)?;

    let report = serializer(&temp_dir).import_json("forward.json")?;
    assert!(report.is_clean());
    assert_eq!(report.graph.get_user(1)?.posts(), &[900, 800]);
    assert_eq!(report.graph.get_user(2)?.comments(), &[5000]);
    assert_eq!(report.graph.get_post(900)?.comments(), &[5000]);
    Ok(())
}

#[test]
fn test_dangling_references_are_dropped_on_load() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let json = r#"{
    "users": {
        "1": {"user_id": 1, "username": "ivan", "email": "ivan@example.com",
              "data_registration": "2024-02-01T08:00:00", "posts": [101, 555], "comments": [1001, 7777]}
    },
    "posts": {
        "101": {"post_id": 101, "user_id": 1, "text": "hello",
                "created_at": "2024-02-01T08:30:00", "comments": [1001, 404]}
    },
    "comments": {
        "1001": {"comment_id": 1001, "user_id": 1, "post_id": 101, "text": "self reply",
                 "created_at": "2024-02-01T09:00:00"}
    }
}"#;
    std::fs::write(temp_dir.path().join("dangling.json"), json)?;

    let report = serializer(&temp_dir).import_json("dangling.json")?;
    assert!(report.rejected.is_empty());
    assert_eq!(report.dropped.len(), 3);
    assert_eq!(report.graph.get_post(101)?.comments(), &[1001]);
    assert_eq!(report.graph.get_user(1)?.posts(), &[101]);
    assert_eq!(report.graph.get_user(1)?.comments(), &[1001]);
    assert!(report.graph.dangling_references().is_empty());
    Ok(())
}

#[test]
fn test_post_without_author_is_reported_not_fabricated() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let json = r#"{
    "users": {
        "1": {"user_id": 1, "username": "ivan", "email": "ivan@example.com",
              "data_registration": "2024-02-01T08:00:00", "posts": [101, 102]}
    },
    "posts": {
        "101": {"post_id": 101, "user_id": 1, "text": "kept", "created_at": "2024-02-01T08:30:00"},
        "102": {"post_id": 102, "text": "no author", "created_at": "2024-02-01T08:31:00"}
    }
}"#;
    std::fs::write(temp_dir.path().join("broken.json"), json)?;

    let report = serializer(&temp_dir).import_json("broken.json")?;
    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(
        &report.rejected[0],
        SocialError::MalformedSnapshot { key, reason, .. } if key == "102" && reason.contains("user_id")
    ));
    assert!(report.graph.get_post(102).is_err());
    assert_eq!(report.graph.get_user(1)?.posts(), &[101]);
    Ok(())
}

#[test]
fn test_wrong_typed_values_stay_local_to_their_entity() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let json = r#"{
    "users": {
        "1": {"user_id": 1, "username": "ivan", "email": "ivan@example.com",
              "data_registration": "2024-02-01T08:00:00", "posts": [101, "x"]},
        "2": {"user_id": "two", "username": "maria", "email": "maria@example.com",
              "data_registration": "2024-02-01T08:05:00"}
    },
    "posts": {
        "101": {"post_id": 101, "user_id": 1, "text": "hello", "created_at": "2024-02-01T08:30:00"}
    }
}"#;
    std::fs::write(temp_dir.path().join("mixed.json"), json)?;

    let report = serializer(&temp_dir).import_json("mixed.json")?;
    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(
        &report.rejected[0],
        SocialError::MalformedSnapshot { key, reason, .. } if key == "2" && reason.contains("user_id")
    ));
    assert!(report.graph.get_user(2).is_err());
    assert_eq!(report.graph.get_user(1)?.posts(), &[101]);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].target, RefTarget::Invalid("\"x\"".to_string()));
    Ok(())
}

#[test]
fn test_repeated_list_entries_are_reported() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let json = r#"{
    "users": {
        "1": {"user_id": 1, "username": "ivan", "email": "ivan@example.com",
              "data_registration": "2024-02-01T08:00:00", "posts": [101, 101]}
    },
    "posts": {
        "101": {"post_id": 101, "user_id": 1, "text": "hello", "created_at": "2024-02-01T08:30:00"}
    }
}"#;
    std::fs::write(temp_dir.path().join("repeated.json"), json)?;

    let report = serializer(&temp_dir).import_json("repeated.json")?;
    assert!(report.rejected.is_empty());
    assert_eq!(report.graph.get_user(1)?.posts(), &[101]);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].to_string(), "user 1 -> post 101");
    Ok(())
}

#[test]
fn test_storage_failures_surface_verbatim() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let serializer = serializer(&temp_dir);

    assert!(matches!(
        serializer.import_json("does-not-exist.json"),
        Err(SocialError::Storage { .. })
    ));

    std::fs::write(temp_dir.path().join("garbage.json"), "not json at all")?;
    assert!(matches!(
        serializer.import_json("garbage.json"),
        Err(SocialError::Serialization(_))
    ));
    Ok(())
}
