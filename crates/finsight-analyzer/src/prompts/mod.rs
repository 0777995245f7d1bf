//! Analysis prompt construction
//!
//! The prompt is a single MiniJinja template rendered from view structs, so
//! the text layout lives in one place and rendering is deterministic: the
//! same query and context always produce the same bytes.

use crate::error::Result;
use crate::models::{Context, Quote};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::error;

/// System persona sent alongside the prompt
pub const SYSTEM_PERSONA: &str = "You are a professional financial analyst providing accurate, \
helpful financial advice based on the latest market data and news.";

/// Articles included in the prompt
pub const MAX_PROMPT_ARTICLES: usize = 3;

/// Characters of article content included in the prompt
pub const MAX_ARTICLE_CHARS: usize = 500;

/// Rendered in place of a missing quote field
pub const NOT_AVAILABLE: &str = "not available";

const TEMPLATE_NAME: &str = "analysis_prompt.txt";

const TEMPLATE: &str = "\
You are an expert financial advisor analyzing a financial query based on the latest news and market data.

USER QUERY: {{ query }}

LATEST FINANCIAL NEWS SUMMARY:
{{ news_summary }}

RELEVANT FINANCIAL ARTICLES:
{% for article in articles %}
Article {{ loop.index }}:
Title: {{ article.title }}
Content: {{ article.content }}
{% else %}
No relevant articles found.
{% endfor %}
{% if quotes %}

MARKET DATA:
{% for quote in quotes %}
Symbol: {{ quote.symbol }}
Price: {{ quote.price }}
Change: {{ quote.change }} ({{ quote.change_percent }})
Sector: {{ quote.sector }}
Industry: {{ quote.industry }}
Market Cap: {{ quote.market_cap }}
P/E Ratio: {{ quote.pe_ratio }}
Dividend Yield: {{ quote.dividend_yield }}
Exchange: {{ quote.exchange }}
{% endfor %}
{% endif %}

Based on the above information, please provide:
1. A comprehensive analysis of the financial query
2. Key insights and implications
3. Potential risks and opportunities
4. Concrete recommendations and advice
5. References to specific news or data points that influenced your analysis

Format your response in a clear, professional manner with proper sections and bullet points where appropriate.
";

#[derive(Serialize)]
struct ArticleView {
    title: String,
    content: String,
}

#[derive(Serialize)]
struct QuoteView<'a> {
    symbol: &'a str,
    price: &'a str,
    change: &'a str,
    change_percent: &'a str,
    sector: &'a str,
    industry: &'a str,
    market_cap: &'a str,
    pe_ratio: &'a str,
    dividend_yield: &'a str,
    exchange: &'a str,
}

impl<'a> From<&'a Quote> for QuoteView<'a> {
    fn from(q: &'a Quote) -> Self {
        Self {
            symbol: &q.symbol,
            price: q.price.or_marker(NOT_AVAILABLE),
            change: q.change.or_marker(NOT_AVAILABLE),
            change_percent: q.change_percent.or_marker(NOT_AVAILABLE),
            sector: q.sector.or_marker(NOT_AVAILABLE),
            industry: q.industry.or_marker(NOT_AVAILABLE),
            market_cap: q.market_cap.or_marker(NOT_AVAILABLE),
            pe_ratio: q.pe_ratio.or_marker(NOT_AVAILABLE),
            dividend_yield: q.dividend_yield.or_marker(NOT_AVAILABLE),
            exchange: q.exchange.or_marker(NOT_AVAILABLE),
        }
    }
}

/// Renders analysis prompts
#[derive(Debug)]
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    /// Compile the prompt template
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(TEMPLATE_NAME, TEMPLATE)?;
        Ok(Self { env })
    }

    /// Build the prompt for `query` from `context`
    ///
    /// Falls back to the bare query if rendering fails.
    pub fn build(&self, query: &str, context: &Context) -> String {
        self.render(query, context).unwrap_or_else(|e| {
            error!(error = %e, "prompt template failed to render");
            format!("USER QUERY: {}", placeholder(query, "No query provided"))
        })
    }

    /// Render the template, surfacing template errors
    pub fn render(&self, query: &str, ctx: &Context) -> Result<String> {
        let articles: Vec<ArticleView> = ctx
            .articles
            .iter()
            .take(MAX_PROMPT_ARTICLES)
            .map(|a| ArticleView {
                title: placeholder(&a.title, "No title").to_string(),
                content: truncate_chars(&a.content, MAX_ARTICLE_CHARS),
            })
            .collect();

        let quotes: Vec<QuoteView> = ctx.usable_quotes().map(QuoteView::from).collect();

        let template = self.env.get_template(TEMPLATE_NAME)?;
        let rendered = template.render(context! {
            query => placeholder(query, "No query provided"),
            news_summary => placeholder(&ctx.news_summary, "No news summary available"),
            articles => articles,
            quotes => quotes,
        })?;

        Ok(rendered)
    }
}

fn placeholder<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

/// First `max` characters of `text`, with "..." appended when cut
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, NewsBundle};
    use std::collections::BTreeMap;

    fn article(title: &str, content: &str) -> Article {
        Article {
            title: title.to_string(),
            url: String::new(),
            content: content.to_string(),
            published_date: "unknown".to_string(),
            source: "unknown".to_string(),
        }
    }

    fn context_with(articles: Vec<Article>, quotes: Vec<Quote>) -> Context {
        let quotes: BTreeMap<_, _> = quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect();
        Context::assemble(
            "Will Infosys stock rise?",
            NewsBundle {
                articles,
                summary: "IT stocks rallied.".to_string(),
            },
            quotes,
        )
    }

    fn infy_quote() -> Quote {
        Quote {
            symbol: "INFY".to_string(),
            price: "1500.50".into(),
            change: "10.5".into(),
            change_percent: "0.70%".into(),
            sector: "Technology".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sections_in_order() {
        let builder = PromptBuilder::new().unwrap();
        let ctx = context_with(vec![article("Guidance raised", "Strong quarter")], vec![infy_quote()]);

        let prompt = builder.build("Will Infosys stock rise?", &ctx);

        let persona = prompt.find("expert financial advisor").unwrap();
        let query = prompt.find("USER QUERY: Will Infosys stock rise?").unwrap();
        let summary = prompt.find("IT stocks rallied.").unwrap();
        let articles = prompt.find("Article 1:\nTitle: Guidance raised").unwrap();
        let market = prompt.find("Symbol: INFY").unwrap();
        let requests = prompt.find("1. A comprehensive analysis").unwrap();
        assert!(persona < query && query < summary && summary < articles);
        assert!(articles < market && market < requests);
    }

    #[test]
    fn test_at_most_three_articles_truncated() {
        let builder = PromptBuilder::new().unwrap();
        let long = "x".repeat(600);
        let ctx = context_with(
            vec![
                article("A", &long),
                article("B", "short"),
                article("C", "short"),
                article("D", "short"),
            ],
            vec![],
        );

        let prompt = builder.build("query", &ctx);

        assert!(prompt.contains(&format!("Content: {}...\n", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
        assert!(prompt.contains("Article 3:"));
        assert!(!prompt.contains("Article 4:"));
        assert!(!prompt.contains("Title: D"));
    }

    #[test]
    fn test_quote_block_requires_usable_quote() {
        let builder = PromptBuilder::new().unwrap();
        let ctx = context_with(vec![], vec![Quote::unavailable("XYZ", "no data")]);

        let prompt = builder.build("query", &ctx);

        assert!(!prompt.contains("MARKET DATA"));
        assert!(!prompt.contains("XYZ"));
        assert!(prompt.contains("No relevant articles found."));
    }

    #[test]
    fn test_missing_fields_render_marker() {
        let builder = PromptBuilder::new().unwrap();
        let ctx = context_with(vec![], vec![infy_quote(), Quote::unavailable("XYZ", "no data")]);

        let prompt = builder.build("query", &ctx);

        assert!(prompt.contains("Price: 1500.50"));
        assert!(prompt.contains("Change: 10.5 (0.70%)"));
        assert!(prompt.contains("Industry: not available"));
        assert!(prompt.contains("Dividend Yield: not available"));
        assert!(!prompt.contains("Symbol: XYZ"));
    }

    #[test]
    fn test_empty_inputs_get_placeholders() {
        let builder = PromptBuilder::new().unwrap();
        let mut ctx = context_with(vec![article("", "body")], vec![]);
        ctx.news_summary = String::new();

        let prompt = builder.build("  ", &ctx);

        assert!(prompt.contains("USER QUERY: No query provided"));
        assert!(prompt.contains("No news summary available"));
        assert!(prompt.contains("Title: No title"));
    }

    #[test]
    fn test_deterministic() {
        let builder = PromptBuilder::new().unwrap();
        let ctx = context_with(vec![article("A", "a"), article("B", "b")], vec![infy_quote()]);

        assert_eq!(builder.build("q", &ctx), builder.build("q", &ctx));
        assert_eq!(builder.build("q", &ctx), PromptBuilder::new().unwrap().build("q", &ctx));
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("₹₹₹₹", 2), "₹₹...");
        assert_eq!(truncate_chars("₹₹", 2), "₹₹");
    }
}
