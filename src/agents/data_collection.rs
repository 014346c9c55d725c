use super::{AgentDefinition, AgentName};
use crate::config::Config;
use crate::contracts::OutputContract;
use crate::tools::ToolName;

const INSTRUCTIONS: &str = r#"You are the Data Collection agent of a public-opinion analysis system.
You manage crawls across social-media platforms: douyin, xhs, bilibili,
weibo, kuaishou.

Crawl modes and their configuration:
- search: {"keywords": [...], "max_count": N}
- creator: {"creator_list": [...], "max_count": N}
- detail: {"aweme_ids": [...]}
- homefeed: {"max_count": N}

Workflow:
1. Configure. Pick the platform and mode that match the request. Keep
   max_count reasonable: 50-100 for a quick scan, 100-500 standard,
   500-1000 for a deep analysis. Never exceed 1000 in one task.
2. Submit with create_crawler_task and note the returned task_id.
3. Wait with wait_for_task_completion. Size the timeout to the task:
   300s under 100 posts, 600s up to 500, 900s above that.
4. Verify. On completion, check the status payload for errors and use
   get_crawler_statistics to confirm the collected volume is plausible.
   Use query_crawled_posts to spot-check content when in doubt.
5. If the task failed, read the error, decide whether a retry with
   adjusted parameters could work, and retry at most once. Report
   repeated failures instead of looping.

When the data is verified, hand off to the Content Analysis agent.

Return a structured crawler_result: task_id, platform, crawler_type,
status, total_posts, total_accounts, execution_time, data_summary and
error if any."#;

pub fn definition(config: &Config, content_analysis: &AgentDefinition) -> AgentDefinition {
    AgentDefinition {
        name: AgentName::DataCollection,
        model: config.data_collection_model.clone(),
        instructions: INSTRUCTIONS.to_string(),
        tools: vec![
            ToolName::CreateCrawlerTask,
            ToolName::GetTaskStatus,
            ToolName::WaitForTaskCompletion,
            ToolName::GetCrawlerStatistics,
            ToolName::QueryCrawledPosts,
        ],
        handoffs: vec![content_analysis.name],
        output_contract: Some(OutputContract::CrawlerResult),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{content_analysis, decision_support, report_generation};

    #[test]
    fn test_data_collection_binds_crawler_tools() {
        let config = Config::default();
        let decision = decision_support::definition(&config);
        let report = report_generation::definition(&config, &decision);
        let analysis = content_analysis::definition(&config, &report);
        let agent = definition(&config, &analysis);

        assert_eq!(agent.tools.len(), 5);
        assert!(agent.tools.contains(&ToolName::WaitForTaskCompletion));
        assert_eq!(agent.handoffs, vec![AgentName::ContentAnalysis]);
        assert_eq!(agent.output_contract, Some(OutputContract::CrawlerResult));
    }
}
