//! Static prompts advertised to MCP clients

use super::types::PromptDefinition;

struct Prompt {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

const OVERVIEW: &str = "# ICAET Knowledge Base

ICAET (International Conference on Advanced Engineering and Technology) keeps a
searchable record of the conference:

- **Talks and sessions**: what was presented and discussed
- **Speakers**: who presented and on which subjects
- **Topics**: the technical themes that ran through the program
- **Key insights**: takeaways drawn from the sessions

Use the `query` tool with a natural language question. Answers are drawn from
the recorded talks, speakers and topics, so questions about a specific speaker,
session or theme work best.
";

const EXAMPLE_QUESTIONS: &str = "# Example Questions for ICAET

## About speakers
- \"What did Leslie Miley talk about?\"
- \"Who presented on software architecture?\"

## About topics
- \"Which sessions covered machine learning?\"
- \"What was said about DevOps practices?\"

## About the conference as a whole
- \"What were the main themes of the conference?\"
- \"Which emerging technologies came up most often?\"

## About specific sessions
- \"What were the key takeaways from the keynote?\"
- \"What API design practices were recommended?\"

Follow-up questions are welcome; narrow in on anything that sounds useful.
";

const FORMATTING_GUIDANCE: &str = "# Tips for Better ICAET Questions

## Do
- Name the speaker, topic or session when you know it
- Ask one thing per question
- Write the way you would ask a colleague
- Ask for examples or concrete recommendations

## Avoid
- Very broad requests such as \"tell me everything\"
- Several unrelated questions in one query

## When results are too broad
Narrow the question to a single speaker, topic or aspect and ask again.
";

const PROMPTS: &[Prompt] = &[
    Prompt {
        name: "icaet_overview",
        description: "Learn what ICAET is and how to use it",
        content: OVERVIEW,
    },
    Prompt {
        name: "example_questions",
        description: "Sample questions to ask ICAET",
        content: EXAMPLE_QUESTIONS,
    },
    Prompt {
        name: "formatting_guidance",
        description: "Tips for writing better ICAET questions",
        content: FORMATTING_GUIDANCE,
    },
];

/// Get all available prompt definitions
pub fn get_prompt_definitions() -> Vec<PromptDefinition> {
    PROMPTS
        .iter()
        .map(|p| PromptDefinition {
            name: p.name.to_string(),
            description: p.description.to_string(),
        })
        .collect()
}

/// Look up a prompt by name, returning its description and text
pub fn get_prompt(name: &str) -> Option<(&'static str, &'static str)> {
    PROMPTS
        .iter()
        .find(|p| p.name == name)
        .map(|p| (p.description, p.content))
}
