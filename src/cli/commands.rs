use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::app::{AppContext, DynlensError, Result};
use crate::cli::{RunSettings, ViewMode};
use crate::domain::CreatorGroup;
use crate::fetcher::HttpPageSource;
use crate::i18n;
use crate::pipeline::{self, PipelineOutput};

pub async fn fetch(ctx: &AppContext, settings: &RunSettings, view: Option<&str>) -> Result<()> {
    let view = match view {
        Some(v) => ViewMode::from_str(v).map_err(DynlensError::Config)?,
        None => settings.view,
    };

    let output = run(ctx, settings).await?;
    report_warnings(&output.warnings);

    if output.from_cache {
        let total: usize = output.groups.iter().map(|g| g.count()).sum();
        println!(
            "{}",
            i18n::tf("from_cache", &[("count", total.to_string())])
        );
    }
    if output.groups.is_empty() {
        println!("{}", i18n::t("no_data"));
        return Ok(());
    }

    println!(
        "{}",
        i18n::tf("creators_header", &[("count", output.groups.len().to_string())])
    );
    for group in &output.groups {
        let latest = group
            .latest_time()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:>4}  {} ({})  {}",
            group.count(),
            group.creator_name,
            group.creator_id,
            latest
        );

        if view == ViewMode::Detail {
            for post in group.posts.iter().take(settings.page_size) {
                println!(
                    "      {} [{}] {}",
                    post.publish_time.format("%Y-%m-%d"),
                    i18n::t(post.kind.label_key()),
                    post.display_title()
                );
            }
        }
    }

    Ok(())
}

pub async fn summarize(ctx: &AppContext, settings: &RunSettings, creator: &str) -> Result<()> {
    let output = run(ctx, settings).await?;
    report_warnings(&output.warnings);

    let Some(group) = find_group(&output.groups, creator) else {
        eprintln!(
            "{}",
            i18n::tf("creator_not_found", &[("id", creator.to_string())])
        );
        return Ok(());
    };

    let (result, warning) = pipeline::get_summary(group, &settings.summary).await;
    if let Some(reason) = warning {
        eprintln!("{}", i18n::tf("summary_warning", &[("reason", reason)]));
    }

    println!(
        "{}",
        i18n::tf(
            "summary_header",
            &[
                ("name", group.creator_name.clone()),
                ("provider", result.provider_used.to_string()),
            ]
        )
    );

    // Map post ids back to the 1-based indices the prompt enumerated, so the
    // console shows compact [n] citations with a source list below.
    let index_of: HashMap<&str, usize> = group
        .posts
        .iter()
        .take(result.source_count)
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i + 1))
        .collect();

    for sentence in &result.sentences {
        let marks: Vec<String> = sentence
            .refs
            .iter()
            .filter_map(|id| index_of.get(id.as_str()).map(ToString::to_string))
            .collect();
        if marks.is_empty() {
            println!("- {}", sentence.text);
        } else {
            println!("- {} [{}]", sentence.text, marks.join(","));
        }
    }

    println!();
    for (i, post) in group.posts.iter().take(result.source_count).enumerate() {
        println!(
            "[{}] {} {}",
            i + 1,
            post.publish_time.format("%Y-%m-%d"),
            post.display_title()
        );
        if !post.url.is_empty() {
            println!("    {}", post.url);
        }
    }

    Ok(())
}

async fn run(ctx: &AppContext, settings: &RunSettings) -> Result<PipelineOutput> {
    let source = HttpPageSource::new(&settings.creds, &settings.fetch)?;

    let mut prompt = stdin_pause;
    let pause: Option<&mut (dyn FnMut(u32) -> bool + Send)> = if settings.interactive {
        Some(&mut prompt)
    } else {
        None
    };

    pipeline::run_pipeline(
        ctx.store.as_ref(),
        &source,
        &settings.creds,
        &settings.fetch,
        &settings.filter,
        &settings.cache,
        pause,
    )
    .await
}

fn find_group<'a>(groups: &'a [CreatorGroup], creator: &str) -> Option<&'a CreatorGroup> {
    groups
        .iter()
        .find(|g| g.creator_id == creator)
        .or_else(|| groups.iter().find(|g| g.creator_name == creator))
}

fn stdin_pause(_next_page: u32) -> bool {
    print!("{}", i18n::t("page_continue"));
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return true;
    }
    !matches!(line.trim().to_lowercase().as_str(), "n" | "q")
}

fn report_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("WARN: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Post, PostKind};
    use chrono::Utc;

    fn group(id: &str, name: &str) -> CreatorGroup {
        CreatorGroup {
            creator_id: id.into(),
            creator_name: name.into(),
            posts: vec![Post {
                id: format!("post-{id}"),
                creator_id: id.into(),
                creator_name: name.into(),
                kind: PostKind::Video,
                publish_time: Utc::now(),
                title: "t".into(),
                body_text: String::new(),
                url: String::new(),
            }],
        }
    }

    #[test]
    fn test_find_group_by_id_then_name() {
        let groups = vec![group("1", "alpha"), group("2", "beta")];
        assert_eq!(find_group(&groups, "2").unwrap().creator_name, "beta");
        assert_eq!(find_group(&groups, "alpha").unwrap().creator_id, "1");
        assert!(find_group(&groups, "gamma").is_none());
    }
}
