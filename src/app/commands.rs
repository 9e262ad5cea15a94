use crate::core::graph::SocialGraph;
use crate::core::serializer::{Format, Serializer};
use crate::core::snapshot::LoadReport;
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// 範例資料：兩位使用者、兩篇貼文、兩則留言，外加一組好友
pub fn sample_graph() -> Result<SocialGraph> {
    let mut graph = SocialGraph::new();
    graph.add_user(1, "ivan", "ivan@example.com")?;
    graph.add_user(2, "maria", "maria@example.com")?;
    graph.add_post(101, 1, "hello")?;
    graph.add_post(102, 2, "weather")?;
    graph.add_comment(1001, 2, 101, "nice post")?;
    graph.add_comment(1002, 1, 102, "agreed")?;
    graph.add_friendship(1, 2)?;
    Ok(graph)
}

/// 明確指定的格式優先，其次依副檔名，最後使用設定檔的預設值
pub fn resolve_format(explicit: Option<Format>, path: &str, fallback: Format) -> Format {
    explicit
        .or_else(|| Format::from_path(path))
        .unwrap_or(fallback)
}

pub fn run_demo<S: Storage>(serializer: &Serializer<S>, format: Format, output: &str) -> Result<String> {
    let graph = sample_graph()?;
    serializer.export(&graph, format, output)?;
    let stats = graph.stats();
    Ok(format!(
        "Exported {} users, {} posts, {} comments to {} ({})",
        stats.users, stats.posts, stats.comments, output, format
    ))
}

pub fn run_inspect<S: Storage>(serializer: &Serializer<S>, format: Format, input: &str) -> Result<String> {
    let report = serializer.import(format, input)?;
    Ok(describe(&report))
}

pub fn run_convert<S: Storage>(
    serializer: &Serializer<S>,
    from: Format,
    input: &str,
    to: Format,
    output: &str,
) -> Result<String> {
    let report = serializer.import(from, input)?;
    if report.graph.is_empty() && !report.rejected.is_empty() {
        tracing::warn!("⚠️ No entity could be loaded from {}, output will be empty", input);
    }
    serializer.export(&report.graph, to, output)?;

    let mut summary = describe(&report);
    summary.push_str(&format!("\nConverted {} ({}) -> {} ({})", input, from, output, to));
    Ok(summary)
}

pub fn describe(report: &LoadReport) -> String {
    let stats = report.graph.stats();
    let mut lines = vec![format!(
        "users: {}, posts: {}, comments: {}, friendships: {}",
        stats.users, stats.posts, stats.comments, stats.friendships
    )];

    for user in report.graph.users() {
        lines.push(format!(
            "  user {} '{}' posts={:?} comments={:?} friends={:?}",
            user.id(),
            user.username(),
            user.posts(),
            user.comments(),
            user.friends()
        ));
    }
    for post in report.graph.posts() {
        lines.push(format!(
            "  post {} by {} comments={:?}",
            post.id(),
            post.author_id(),
            post.comments()
        ));
    }

    if !report.rejected.is_empty() {
        lines.push(format!("rejected entities: {}", report.rejected.len()));
        lines.extend(report.rejected.iter().map(|e| format!("  {}", e)));
    }
    if !report.dropped.is_empty() {
        lines.push(format!("dropped references: {}", report.dropped.len()));
        lines.extend(report.dropped.iter().map(|r| format!("  {}", r)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_graph_shape() {
        let graph = sample_graph().unwrap();
        let stats = graph.stats();
        assert_eq!((stats.users, stats.posts, stats.comments, stats.friendships), (2, 2, 2, 1));
    }

    #[test]
    fn test_resolve_format_precedence() {
        assert_eq!(resolve_format(Some(Format::Xml), "a.json", Format::Json), Format::Xml);
        assert_eq!(resolve_format(None, "a.xml", Format::Json), Format::Xml);
        assert_eq!(resolve_format(None, "a.out", Format::Json), Format::Json);
    }
}
