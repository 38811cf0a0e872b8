/// System instruction sent with every frame. The JSON layout it asks for is
/// the contract enforced by [`super::parser::parse`].
pub const ANALYSIS_PROMPT: &str = r#"
You are an intelligent assistant for the E-Vive swarm robotics system. Your job is to analyze an image of an electronic waste area and simulate how the robot swarm would act.

Tasks:
1. Identify and count visible electronic components such as chips, motors, sensors, wires.
2. For each identified component, classify it based on visible condition:
   - Good condition -> Reuse
   - Damaged but possibly repairable -> Repair
   - Severely damaged or burned -> Recycle
3. Provide a summary of how the E-Vive Collector bots and the Sorter bot would handle this image.

Return ONLY valid JSON using this format:
{
  "component_summary": "Total X components (e.g. 2 chips, 1 motor, 3 wires)",
  "component_distribution": {
    "Reuse": [ "chip", "motor" ],
    "Repair": [ "sensor" ],
    "Recycle": [ "wire", "board" ]
  },
  "swarm_action": "Collector bots will extract reusable and repairable items and deliver to Sorter bot.",
  "sorter_decision": "Sorter will place components into 3 bins accordingly.",
  "reasoning": "Explain how decisions were made based on the condition and component type."
}

Do not return any explanation outside of this JSON block.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parser::{self, REQUIRED_FIELDS};

    #[test]
    fn test_prompt_names_every_required_field() {
        for field in REQUIRED_FIELDS {
            assert!(ANALYSIS_PROMPT.contains(field), "prompt is missing {}", field);
        }
    }

    #[test]
    fn test_prompt_example_satisfies_parser() {
        let start = ANALYSIS_PROMPT.find('{').unwrap();
        let end = ANALYSIS_PROMPT.rfind('}').unwrap();
        let example = &ANALYSIS_PROMPT[start..=end];
        assert!(parser::parse(example).is_ok());
    }
}
