//! Prompt templates for the two LLM passes.
//!
//! Every report is produced by two jobs:
//!
//! 1. **Analyst pass**: raw PDF text in, a loose JSON of extracted facts out.
//! 2. **Editor pass**: the analyst JSON in, the final `header_info` /
//!    `body_content` / `footer_info` document out.
//!
//! Standard categories share one template pair parameterised by
//! `{category}`; Weekly Fund Flow has its own pair. Keeping them here means
//! the job client never sees category logic and the renderer's expectations
//! (`**...**` spans, header keys) are documented next to the prompts that
//! produce them.

use crate::config::ReportCategory;

/// Separator placed between the prompt and the content of a job.
pub const INPUT_SEPARATOR: &str = "\n\n=== INPUT DATA ===\n";

/// Analyst pass for Equity / Macro / FX&Commodity.
pub const ANALYST_PROMPT_TEMPLATE: &str = r#"
# Role
You are a Senior Financial Analyst. Extract raw data from the provided OCR text.

# USER INSTRUCTION
The user has defined this report category as: **{category}**.

# Task
1. **Extract Meta Data:** Institution Name, Analyst Name.
2. **Extract Core Content based on Category:**
   - **Since this is {category}:**
     - If **Equity**: Extract Ticker (US or HK listing; give all if both are present), Company Name, Rating, Target Price, Previous Target Price (if mentioned).
     - If **Macro/FX&Commodity**: Ignore Ticker/Rating/TP. Focus on the main economic indicator or asset class.
   - Extract Thesis Summary & Key Drivers/Catalysts.
   - Note the Currency (HKD, USD, RMB, etc.).

# Output Format (JSON)
{
  "meta": { "institution": "", "analyst": "" },
  "stock": { "ticker": "", "name": "", "rating": "", "target_price": "", "target_price_previous": "", "currency": "" },
  "content_raw": {
    "thesis_summary": "...",
    "drivers": ["...", "..."],
    "financial_outlook": "..."
  }
}
"#;

/// Editor pass for Equity / Macro / FX&Commodity.
pub const EDITOR_PROMPT_TEMPLATE: &str = r#"
# Role
You are a Strict Financial Editor. Reformat extracted data into a specific JSON schema.
body_content must be 400-500 words in 4-5 paragraphs.

# USER INSTRUCTION
The report category is defined as: **{category}**.
**Price Target Format:**
  - MUST include Currency (HKD, USD, RMB).
  - If a **Previous Target** exists, put it in parentheses: `(Previous Price Target: XX.00)`. Otherwise omit it. Keep two decimals.
  - If both HKD and USD targets exist, join them with `/`.

# STRICT RULES
1. **Bank Acronyms:** Use acronyms (JPM, GS, MS, DB, CITICS) in `summary` and `body_content`.
2. **Grammar:** Treat acronyms as **PLURAL** (e.g. "JPM **expect**").
3. Never show the full bank name in body_content.

# Red Highlighting Rule (CRITICAL)
In `body_content`, identify the core viewpoint of EACH paragraph and wrap it in double asterisks `**`.
The highlighted sentence MUST follow the pattern `**[Acronym] [plural verb] [key insight]...**`.
* Good: `**JPM maintain their Overweight rating due to strong cash flow.**`
* Good: `**GS estimate a 20% upside in FY26 earnings.**`
* Bad: `**They expect...**` (must start with the bank acronym)
* Bad: `**JPM expects...**` (verb must be plural)
Keep highlighted sentences short.

# JSON Structure Rules based on Category: **{category}**
- If {category} == 'Equity': you MUST fill in `stock`, `rating`, `price_target`.
- Otherwise: leave `stock`, `rating`, `price_target` as EMPTY STRINGS ("").

# Output Schema (JSON Only)
{
  "header_info": {
    "category": "Wall Street Highlights-{category}",
    "date": "YYYY/MM/DD",
    "title": "[Full Bank Name]: [Report Title], including the stock as name(ticker.market), e.g. China Mobile(941.HK)",
    "summary": "[Acronym] [plural verb]... (max 60 words)",
    "tags": "3 relevant Chinese tags separated by `/` (e.g. 消费/港股/电子)",
    "stock": "Ticker string (e.g. 9988.HK / BABA.US) OR empty",
    "rating": "Rating OR empty",
    "price_target": "Formatted price string (e.g. HKD100.00 (Previous Price Target: HKD80.00))"
  },
  "body_content": [
    "Paragraph 1 with its key sentence wrapped in **.",
    "Paragraph 2 with its key sentence wrapped in **."
  ],
  "footer_info": {
    "stock": "Same as header stock",
    "rating": "Same as header rating",
    "price_target": "Same as header price_target"
  }
}
"#;

/// Extraction pass for Weekly Fund Flow.
pub const FUND_FLOW_EXTRACT_PROMPT: &str = r#"
# Role
You are a Financial Data Analyst. Extract content from a Weekly Fund Flows report.

# Task
1. **Extract Meta**: institution name (e.g. Goldman Sachs), analyst name, report date.
2. **Extract Title**: the descriptive English line that follows the upper-case "WEEKLY FUND FLOWS" banner (e.g. "Robust Bond Flows Year-to-Date").
3. **Extract Summary**: the first body paragraph, usually bulleted, describing mutual funds overall.
4. **Extract Body**: the paragraphs describing Equity, Fixed Income and FX / cross-border flows.

# Output Format (JSON)
{
  "meta": { "institution": "Goldman Sachs", "title_en": "" },
  "raw_content": {
    "summary_text": "",
    "body_text": ""
  }
}
"#;

/// Translation / formatting pass for Weekly Fund Flow.
pub const FUND_FLOW_TRANSLATE_PROMPT: &str = r#"
# Role
You are a senior financial translator. Translate an investment bank's Weekly Fund Flows report into Chinese.

# TRANSLATION RULES
1. **Title**: `【市场动态】` followed by the translation of meta.title_en.
2. **Summary**: translate only the first sentence of the report.
3. **Terminology** (mandatory):
   - "Negative flows" -> 资金净流出
   - "Net inflow" -> 净流入
   - "Mainland China" -> 中国大陆
   - "Led by the US" -> 主要由美国...带动
   - "AUM" -> keep AUM
   - "sector level" -> 板块层面
   - "Underlying patterns are quite different" -> 资金流分化明显
   - "+" -> 录得
4. **Data style**: for inflow / outflow figures use `[description] (本周录得XX，前一周为XX)` with values taken from the source.

# Filling rules
- MUST fill: `Title`, `Summary`, `body_content`.
- MUST leave as "": every other header_info field (Category, Tags, Stock, ratings, targets...).
- body_content must not contain colons or plus/minus signs.

# Output Schema (JSON Only)
{
  "header_info": {
    "Category": "",
    "Date": "",
    "Title": "【市场动态】...",
    "Summary": "...",
    "From": "CIO Office",
    "Tags": "",
    "Recommend Expire Time": "",
    "Language": "Chinese",
    "Stock": "",
    "Stock Rating": "",
    "12m Price Target": "",
    "Related Stock List": "",
    "Related Stock Rating": ""
  },
  "body_content": [
    "Paragraph 1: second paragraph of the source, opening with the week-ending date (e.g. 截至1月14日当周)",
    "Paragraph 2: third paragraph of the source",
    "Paragraph 3: fourth paragraph, opening with the cross-border FX flows"
  ]
}
"#;

/// System prompt for the first (extraction) job of `category`.
pub fn analyst_prompt(category: ReportCategory) -> String {
    if category.is_fund_flow() {
        FUND_FLOW_EXTRACT_PROMPT.to_string()
    } else {
        ANALYST_PROMPT_TEMPLATE.replace("{category}", category.label())
    }
}

/// System prompt for the second (editing) job of `category`.
pub fn editor_prompt(category: ReportCategory) -> String {
    if category.is_fund_flow() {
        FUND_FLOW_TRANSLATE_PROMPT.to_string()
    } else {
        EDITOR_PROMPT_TEMPLATE.replace("{category}", category.label())
    }
}

/// Join a system prompt and its input into the single text blob a job carries.
pub fn compose_job_prompt(prompt: &str, content: &str) -> String {
    format!("{prompt}{INPUT_SEPARATOR}{content}")
}
