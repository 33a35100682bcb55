// src/synth/presets.rs
//! Built-in pipeline shapes.
//!
//! `feed-digest`: feeds + Hacker News, one analysis stage.
//! `search-digest`: search retrieval, then a draft stage and a polishing stage.

use serde::{Deserialize, Serialize};

use super::{ItemDetail, ServiceKind, StageDescriptor};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    #[default]
    FeedDigest,
    SearchDigest,
}

impl Preset {
    pub fn stages(&self) -> Vec<StageDescriptor> {
        match self {
            Preset::FeedDigest => feed_digest_stages(),
            Preset::SearchDigest => search_digest_stages(),
        }
    }
}

const ANALYSIS_TEMPLATE: &str = "Analyze the IT news below and write a blog post.

[Headlines]
{input}

[Requirements]
Length: {target_length}
Structure:
{outline}

Style: {tone}
Format: markdown (###, ####), **bold**, [links](URL), task lists (- [ ]) for action items.

Every trend needs concrete data and a practical insight.";

const ANALYSIS_OUTLINE: &str = "- Introduction (about 10%): the three key trends of the day
- Trend 1 (about 30%): status / technical background / market impact / practical use
- Trend 2 (about 30%): same structure
- Trend 3 (about 30%): same structure
- Conclusion (about 10%): how the trends connect, plus action items";

pub fn feed_digest_stages() -> Vec<StageDescriptor> {
    vec![StageDescriptor {
        id: "analysis".into(),
        service: ServiceKind::OpenAi,
        model: "gpt-4o-mini".into(),
        persona: Some("IT journalist. Concise, insightful analysis.".into()),
        template: ANALYSIS_TEMPLATE.into(),
        target_length: "about 3000 characters".into(),
        outline: ANALYSIS_OUTLINE.into(),
        tone: "professional yet practical, with real company examples".into(),
        temperature: 0.7,
        max_tokens: 2500,
        // Only the first few headlines go into the prompt to keep input tokens low.
        input_limit: Some(5),
        item_detail: ItemDetail::Brief,
    }]
}

const DRAFT_TEMPLATE: &str = "Write a blog post for AI startup founders and developers based on the news below.

{input}

[Audience]
- Startup founders following the AI market
- Working developers

[Requirements]
Length: {target_length}
Tone: {tone}

[Structure]
{outline}

[Style guide]
- Use markdown (##, ###, **bold**)
- Include concrete numbers and cases
- No flowery language or exclamations
- Short, clear sentences";

const DRAFT_OUTLINE: &str = "## 1. Intro
- Open with a hook question or statistic from the articles
- Tie it to the reader's real concerns

## 2. Body - three key points
For each section:
- A short subheading that is not merely descriptive
- Practical tips or concrete cases
- Information, insight and risk perspectives
- Short, clear paragraphs

## 3. Wrap-up
- Summary of the key points
- One actionable insight";

const POLISH_TEMPLATE: &str = "Improve the following blog post for an audience of AI startups and developers:

{input}

[Improvements]
1. Tone: {tone}
2. Content: practical tips, concrete tools, libraries and APIs; balance with failure cases and caveats; tone down anything overhyped.
3. Structure: subheadings that spark curiosity without exaggeration; key facts in **bold**; remove filler.
4. Examples: things a developer can try right away; investment and hiring angles.

Keep the markdown format, clean and easy to read.";

pub fn search_digest_stages() -> Vec<StageDescriptor> {
    vec![
        StageDescriptor {
            id: "draft".into(),
            service: ServiceKind::OpenAi,
            model: "gpt-4o-mini".into(),
            persona: Some(
                "AI market expert. Practical, understated insight for startups and developers; fact-driven, no embellishment."
                    .into(),
            ),
            template: DRAFT_TEMPLATE.into(),
            target_length: "2500-3000 characters".into(),
            outline: DRAFT_OUTLINE.into(),
            tone: "bright and realistic, calm knowledge transfer without exaggeration".into(),
            temperature: 0.8,
            max_tokens: 2500,
            input_limit: None,
            item_detail: ItemDetail::Full,
        },
        StageDescriptor {
            id: "polished".into(),
            service: ServiceKind::Anthropic,
            model: "claude-3-haiku-20240307".into(),
            persona: None,
            template: POLISH_TEMPLATE.into(),
            target_length: String::new(),
            outline: String::new(),
            tone: "remove excessive adjectives, stay factual, objective and practical".into(),
            temperature: 0.3,
            max_tokens: 3000,
            input_limit: None,
            item_detail: ItemDetail::Brief,
        },
    ]
}
