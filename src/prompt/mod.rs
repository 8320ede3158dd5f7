// src/prompt/mod.rs

use std::collections::BTreeSet;

/// Marker closing every prompt; the model's answer follows it.
pub const RESPONSE_MARKER: &str = "### Response:";

/// Builds the instruction prompt for single and chained commands.
pub fn format_prompt(instruction: &str, vocabulary: &BTreeSet<String>) -> String {
    let actions = vocabulary
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"### Instruction:
You are an AI that converts natural language instructions into structured JSON action plans.

For SINGLE actions, output a JSON object with these fields:
- object: the object to manipulate (use spaces, not underscores)
- initial_position: where the object currently is (named position or coordinates)
- action: what to do, one of: {actions}
- target_position: EITHER a named position (like "left", "center", "top shelf", "red platform") OR coordinates in format "(x, y)" for precise placement

For CHAINED/SEQUENTIAL actions (when the instruction contains "then", "after", or multiple steps), output:
{{
  "sequence": [
    {{"object": "...", "initial_position": "...", "action": "...", "target_position": "..."}},
    {{"object": "...", "initial_position": "...", "action": "...", "target_position": "..."}}
  ]
}}

COORDINATE EXAMPLES:
- "move red box to coordinates 200, 300" -> target_position: "(200, 300)"
- "move blue ball to position 400 150" -> target_position: "(400, 150)"
- "slide cube to x 100 y 250" -> target_position: "(100, 250)"

NAMED POSITION EXAMPLES:
- center, left, right, top, bottom
- top left, top right, bottom left, bottom right
- red platform, blue platform, green platform
- table, floor, top shelf

IMPORTANT:
- Never use underscores (_) in any field values. Always use spaces between words.
- Output ONLY valid JSON, no explanations.

### Input:
{instruction}

{RESPONSE_MARKER}
"#
    )
}
