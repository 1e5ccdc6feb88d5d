pub mod citations;
pub mod coverage;

use serde_json::json;
use shannon_patterns::{hybrid, parallel, react, sequential, ParallelConfig, PatternContext, ReactConfig, Workspace};
use shannon_router::Decomposer;
use shannon_types::{EventType, MemoryQueryFilter, MemoryStore, Plan, ShannonResult};

use crate::common::StrategyOutput;
use citations::Citation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchStrategyTier {
    Quick,
    Standard,
    Deep,
    Academic,
}

#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub tier: ResearchStrategyTier,
    pub max_concurrent_agents: usize,
    pub enable_verification: bool,
    pub gap_fill_max_iterations: u32,
    pub coverage_min_chars: usize,
    pub coverage_min_citations: usize,
    pub diversity_cap_per_domain: usize,
    pub draft_max_chars: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        ResearchConfig {
            tier: ResearchStrategyTier::Standard,
            max_concurrent_agents: 5,
            enable_verification: false,
            gap_fill_max_iterations: 2,
            coverage_min_chars: 600,
            coverage_min_citations: 2,
            diversity_cap_per_domain: 3,
            draft_max_chars: 6000,
        }
    }
}

const RESEARCH_TOOLS: &[&str] = &["web_search", "web_fetch"];

/// §4.G Research: memory → refine query → decompose → execute → entity
/// filter → citation collection → gap filling → synthesize with coverage
/// checks and continuation on truncation → reflect → optional verify.
pub async fn run(
    ctx: &PatternContext,
    query: &str,
    decomposer: &dyn Decomposer,
    memory: Option<(&dyn MemoryStore, &str)>,
    config: &ResearchConfig,
    attempt: u32,
) -> ShannonResult<StrategyOutput> {
    let mut steps = Vec::new();

    let memory_context = fetch_memory_context(ctx, memory, query).await;

    let refine_prompt = if memory_context.is_empty() {
        format!("Refine this research query to be specific and searchable: {query}")
    } else {
        format!(
            "Prior session context:\n{memory_context}\n\nRefine this research query to be specific and searchable: {query}"
        )
    };
    let refined = ctx.run_agent_step("refine-query", &refine_prompt, None, attempt).await?;
    let refined_query = non_empty_or(&refined.response, query);
    steps.push(refined.clone());

    let mut plan = decomposer.decompose(refined_query, &json!({})).await?;
    force_research_tools(&mut plan);
    let areas = plan_areas(&plan);

    let execute_out = execute_plan(ctx, &plan, config, attempt).await?;
    steps.extend(execute_out.steps.clone());

    let entity_prompt = format!(
        "Extract the key facts and named entities relevant to \"{refined_query}\" from this research material, \
         preserving any URLs verbatim:\n\n{}",
        execute_out.response
    );
    let entity_filtered = ctx.run_agent_step("entity-filter", &entity_prompt, None, attempt).await?;
    steps.push(entity_filtered.clone());

    let mut raw_references = citations::extract_urls(&execute_out.response);
    raw_references.extend(citations::extract_urls(&entity_filtered.response));
    let mut citation_pool = citations::collect(&citations::score_by_order(&raw_references), config.diversity_cap_per_domain);

    let mut draft = synthesize(ctx, "synthesize-0", refined_query, &entity_filtered.response, &citation_pool, &areas, attempt).await?;
    steps.push(draft.clone());
    let mut current_response = draft.response.clone();

    let mut gap_iterations = 0u32;
    for iteration in 0..config.gap_fill_max_iterations {
        let mut gaps = coverage::find_gaps(&current_response, &areas, config.coverage_min_chars, config.coverage_min_citations);
        if coverage::has_explicit_gap_phrase(&current_response) && gaps.is_empty() {
            gaps = areas.clone();
        }
        if gaps.is_empty() {
            break;
        }
        gap_iterations += 1;

        let mut gap_fill_text = String::new();
        for area in &gaps {
            let gap_id = format!("gap-fill-{iteration}-{}", sanitize(area));
            let gap_prompt = format!("Research more specifically about \"{area}\" in the context of: {refined_query}");
            let gap_result = ctx.run_agent_step(&gap_id, &gap_prompt, Some(&research_tools()), attempt).await?;
            gap_fill_text.push_str(&gap_result.response);
            gap_fill_text.push('\n');
            raw_references.extend(citations::extract_urls(&gap_result.response));
            steps.push(gap_result);
        }
        citation_pool = citations::collect(&citations::score_by_order(&raw_references), config.diversity_cap_per_domain);

        let combined_content = format!("{}\n\n{}", entity_filtered.response, gap_fill_text);
        draft = synthesize(ctx, &format!("synthesize-{}", iteration + 1), refined_query, &combined_content, &citation_pool, &areas, attempt).await?;
        current_response = draft.response.clone();
        steps.push(draft.clone());
    }

    if coverage::looks_truncated(&current_response, config.draft_max_chars) {
        let continuation = ctx
            .run_agent_step(
                "continue-draft",
                &format!("Continue this research report where it left off, without repeating prior text:\n\n{current_response}"),
                None,
                attempt,
            )
            .await?;
        current_response.push('\n');
        current_response.push_str(&continuation.response);
        steps.push(continuation);
    }

    let remaining_gaps = coverage::find_gaps(&current_response, &areas, config.coverage_min_chars, config.coverage_min_citations);
    if !remaining_gaps.is_empty() {
        current_response.push_str(&format!(
            "\n\n_Note: coverage for {} could not be fully verified within the gap-filling iteration budget; treat related claims as unverified._\n",
            remaining_gaps.join(", ")
        ));
    }

    let reflect_prompt = format!(
        "Research report on \"{refined_query}\":\n\n{current_response}\n\nScore this report's quality from 0.0 to 1.0 and give one \
         sentence of feedback. Reply as 'Score: <n>\\nFeedback: <text>'."
    );
    let reflection = ctx.run_agent_step("reflect", &reflect_prompt, None, attempt).await?;
    steps.push(reflection.clone());
    if parse_score(&reflection.response) < 0.5 {
        let revised = ctx
            .run_agent_step(
                "revise",
                &format!("{current_response}\n\nFeedback: {}\n\nRevise the report to address this feedback.", reflection.response),
                None,
                attempt,
            )
            .await?;
        current_response = revised.response.clone();
        steps.push(revised);
    }

    let mut verification_notes = Vec::new();
    if config.enable_verification {
        for (i, citation) in citation_pool.iter().take(5).enumerate() {
            let verify_prompt = format!(
                "Does the source at {} plausibly support a claim in this report? Reply 'SUPPORTED' or 'UNSUPPORTED' with a reason.\n\n{current_response}",
                citation.url
            );
            let verify = ctx.run_agent_step(&format!("verify-{i}"), &verify_prompt, None, attempt).await?;
            if !verify.response.to_uppercase().contains("SUPPORTED") || verify.response.to_uppercase().contains("UNSUPPORTED") {
                verification_notes.push(citation.url.clone());
            }
            steps.push(verify);
        }
        if !verification_notes.is_empty() {
            current_response.push_str(&format!("\n\n_Unverified sources: {}_\n", verification_notes.join(", ")));
        }
    }

    Ok(StrategyOutput {
        response: current_response,
        confidence: None,
        metadata: json!({
            "strategy": "research",
            "tier": format!("{:?}", config.tier),
            "citations_count": citation_pool.len(),
            "gap_fill_iterations": gap_iterations,
            "areas": areas,
            "verification_run": config.enable_verification,
            "unverified_sources": verification_notes,
        }),
        steps,
    })
}

async fn fetch_memory_context(ctx: &PatternContext, memory: Option<(&dyn MemoryStore, &str)>, query: &str) -> String {
    let Some((store, session_id)) = memory else {
        return String::new();
    };
    let filter = MemoryQueryFilter::default();
    match store.query(session_id, query, 5, &filter).await {
        Ok(items) => items.into_iter().map(|item| item.content).collect::<Vec<_>>().join("\n"),
        Err(err) => {
            ctx.emit(EventType::ErrorRecovery, "research", &format!("memory lookup failed: {err}")).await;
            String::new()
        }
    }
}

fn force_research_tools(plan: &mut Plan) {
    for subtask in &mut plan.subtasks {
        for tool in research_tools() {
            if !subtask.suggested_tools.contains(&tool) {
                subtask.suggested_tools.push(tool);
            }
        }
    }
}

fn research_tools() -> Vec<String> {
    RESEARCH_TOOLS.iter().map(|s| s.to_string()).collect()
}

/// One area per decomposed subtask, titled from its description (§4.G
/// `### Area` headings are checked against these titles).
fn plan_areas(plan: &Plan) -> Vec<String> {
    if plan.subtasks.is_empty() {
        return Vec::new();
    }
    plan.subtasks.iter().map(|s| area_title(&s.description)).collect()
}

fn area_title(description: &str) -> String {
    let cleaned = description
        .trim()
        .trim_start_matches("Research ")
        .trim_start_matches("research ")
        .trim_start_matches("Analyze ")
        .trim_start_matches("analyze ");
    let title: String = cleaned.split(['.', ':']).next().unwrap_or(cleaned).trim().to_string();
    if title.is_empty() {
        description.trim().to_string()
    } else {
        title
    }
}

fn sanitize(area: &str) -> String {
    area.chars().map(|c| if c.is_alphanumeric() { c } else { '-' }).collect()
}

async fn execute_plan(
    ctx: &PatternContext,
    plan: &Plan,
    config: &ResearchConfig,
    attempt: u32,
) -> ShannonResult<shannon_patterns::PatternOutput> {
    if plan.subtasks.is_empty() {
        return react::run(ctx, &plan_query_fallback(plan), &ReactConfig { tools: research_tools(), ..ReactConfig::default() }, attempt).await;
    }

    match config.tier {
        ResearchStrategyTier::Quick => sequential::run(ctx, &plan.subtasks, attempt).await,
        _ if plan.has_p2p_coordination() => {
            let workspace = Workspace::new();
            let parallel_config = ParallelConfig { max_concurrent_agents: config.max_concurrent_agents };
            hybrid::run(ctx, &plan.subtasks, &parallel_config, &workspace, shannon_patterns::DEFAULT_P2P_TIMEOUT, attempt).await
        }
        _ => {
            let parallel_config = ParallelConfig { max_concurrent_agents: config.max_concurrent_agents };
            parallel::run(ctx, &plan.subtasks, &parallel_config, attempt).await
        }
    }
}

fn plan_query_fallback(plan: &Plan) -> String {
    plan.subtasks.first().map(|s| s.description.clone()).unwrap_or_default()
}

async fn synthesize(
    ctx: &PatternContext,
    agent_id: &str,
    query: &str,
    content: &str,
    citation_pool: &[Citation],
    areas: &[String],
    attempt: u32,
) -> ShannonResult<shannon_types::AgentExecutionResult> {
    let citation_list = citation_pool
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i + 1, c.url))
        .collect::<Vec<_>>()
        .join("\n");
    let area_list = if areas.is_empty() { "the topic".to_string() } else { areas.join(", ") };

    let prompt = format!(
        "Write a research report answering: {query}\n\nSource material:\n{content}\n\nAvailable citations:\n{citation_list}\n\n\
         Structure the report with one '### <Area>' heading per area in [{area_list}], each section at least several \
         paragraphs long and citing at least two of the sources above with inline [n] markers."
    );
    ctx.run_agent_step(agent_id, &prompt, None, attempt).await
}

fn non_empty_or<'a>(candidate: &'a str, fallback: &'a str) -> &'a str {
    if candidate.trim().is_empty() {
        fallback
    } else {
        candidate
    }
}

fn parse_score(text: &str) -> f64 {
    text.lines()
        .find_map(|line| {
            let lower = line.to_ascii_lowercase();
            lower.strip_prefix("score:").and_then(|rest| rest.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use shannon_patterns::test_support::stub_context;
    use shannon_types::Subtask;

    use super::*;

    struct StubDecomposer;

    #[async_trait]
    impl Decomposer for StubDecomposer {
        async fn decompose(&self, _query: &str, _context: &serde_json::Value) -> ShannonResult<Plan> {
            Ok(Plan {
                subtasks: vec![
                    Subtask {
                        id: "langchain".to_string(),
                        description: "Research LangChain framework".to_string(),
                        depends_on: Vec::new(),
                        suggested_tools: Vec::new(),
                        tool_parameters: None,
                        produces: Vec::new(),
                        consumes: Vec::new(),
                    },
                    Subtask {
                        id: "autogen".to_string(),
                        description: "Research AutoGen framework".to_string(),
                        depends_on: Vec::new(),
                        suggested_tools: Vec::new(),
                        tool_parameters: None,
                        produces: Vec::new(),
                        consumes: Vec::new(),
                    },
                ],
                complexity: 0.8,
            })
        }
    }

    #[tokio::test]
    async fn forces_web_search_onto_every_subtask() {
        let mut plan = Plan {
            subtasks: vec![Subtask {
                id: "a".to_string(),
                description: "a".to_string(),
                depends_on: Vec::new(),
                suggested_tools: Vec::new(),
                tool_parameters: None,
                produces: Vec::new(),
                consumes: Vec::new(),
            }],
            complexity: 0.5,
        };
        force_research_tools(&mut plan);
        assert!(plan.subtasks[0].suggested_tools.contains(&"web_search".to_string()));
    }

    #[tokio::test]
    async fn runs_full_pipeline_and_records_areas() {
        let ctx = stub_context();
        let decomposer = StubDecomposer;
        let config = ResearchConfig::default();
        let out = run(&ctx, "Compare LangChain and AutoGen frameworks", &decomposer, None, &config, 1).await.unwrap();
        assert_eq!(out.metadata["areas"].as_array().unwrap().len(), 2);
        assert!(!out.steps.is_empty());
    }

    #[test]
    fn area_title_strips_research_prefix() {
        assert_eq!(area_title("Research LangChain framework"), "Research LangChain framework".trim_start_matches("Research "));
    }
}
