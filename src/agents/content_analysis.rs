use super::{AgentDefinition, AgentName};
use crate::config::Config;
use crate::contracts::OutputContract;
use crate::tools::ToolName;

const INSTRUCTIONS: &str = r#"You are the Content Analysis agent of a public-opinion analysis system.
You run multi-dimensional analysis over a batch of crawled posts.

Order of work:
1. Sensitive content first. It carries the highest risk and shapes the
   rest of the analysis. Run analyze_sensitive_content on every post with
   a video. A "block" recommendation or confidence above 0.8 marks the
   post high-risk immediately.
2. Then the remaining dimensions, which are independent of each other:
   - analyze_sentiment on each post's title plus description;
   - extract_topics over the whole corpus (5-8 topics is usually right);
   - detect_trends over the posts with their timestamps and engagement
     counts;
   - analyze_engagement on each post's like/comment/share/view counts to
     find outlier content.
3. Aggregate. Produce per-dimension summaries: violation counts by type,
   sentiment distribution with dominant emotions, topic list with corpus
   percentages, trend list, and engagement statistics.

Tool failures come back as results with an "error" field. Count them,
keep going, and report coverage honestly, e.g. "8 of 10 videos analyzed,
2 failed". A partly-analyzed batch is still a valid result; an aborted
analysis is not.

When analysis is complete, hand off to the Report Generation agent.

Return a structured analysis_result: total_analyzed, the five dimension
summaries, high_risk_posts and recommendations."#;

pub fn definition(config: &Config, report_generation: &AgentDefinition) -> AgentDefinition {
    AgentDefinition {
        name: AgentName::ContentAnalysis,
        model: config.analysis_model.clone(),
        instructions: INSTRUCTIONS.to_string(),
        tools: vec![
            ToolName::AnalyzeSensitiveContent,
            ToolName::AnalyzeSentiment,
            ToolName::ExtractTopics,
            ToolName::DetectTrends,
            ToolName::AnalyzeEngagement,
        ],
        handoffs: vec![report_generation.name],
        output_contract: Some(OutputContract::AnalysisResult),
    }
}
