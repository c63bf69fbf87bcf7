//! Terraform/OpenTofu output processor: plan, apply, destroy.

use std::sync::LazyLock;

use regex::Regex;

use super::Processor;

const HOOK_PATTERNS: &[&str] = &[r"^(terraform|tofu)\s+(plan|apply|destroy)\b"];

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOOK_PATTERNS[0]).expect("valid terraform pattern"));

static INIT_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((Initializing|Acquiring|Installing|Reusing)\s+|-\s+Installed\s+|Initializing the backend|Successfully configured)",
    )
    .expect("valid init noise pattern")
});

static RESOURCE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+\S+").expect("valid resource header pattern"));

static RESOURCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+~-]\s+resource\s+").expect("valid resource open pattern"));

static CHANGED_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[~+-]").expect("valid changed attribute pattern"));

static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Plan:|Apply complete|Destroy complete|No changes|Changes to Outputs:|Note:)")
        .expect("valid summary pattern")
});

static OUTPUT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+~-]\s+\w+\s*=").expect("valid output value pattern"));

static DIAGNOSTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Error|Warning|error|warning)\b").expect("valid diagnostic pattern")
});

/// Plans at or below this many lines are left unchanged.
const MAX_UNCHANGED: usize = 30;

/// What a resource block will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Create,
    Destroy,
    Update,
    Unknown,
}

impl Action {
    fn from_header(header: &str) -> Self {
        if header.contains("will be created") {
            Action::Create
        } else if header.contains("will be destroyed") {
            Action::Destroy
        } else if header.contains("will be updated") || header.contains("must be replaced") {
            Action::Update
        } else {
            Action::Unknown
        }
    }
}

/// Processor for terraform plan/apply output.
#[derive(Debug, Default)]
pub struct TerraformProcessor;

impl TerraformProcessor {
    /// Create a new TerraformProcessor.
    pub fn new() -> Self {
        Self
    }

    /// Whether a line inside a resource block is worth keeping.
    fn keep_attribute(stripped: &str, action: Action) -> bool {
        if stripped.contains("->") || CHANGED_ATTR_RE.is_match(stripped) {
            return true;
        }
        if stripped.contains("(known after apply)") || stripped.contains("forces replacement") {
            return true;
        }
        // New resources are shown in full; unchanged attributes of updates
        // and destroyed resources are dropped.
        action == Action::Create
    }
}

impl Processor for TerraformProcessor {
    fn name(&self) -> &str {
        "terraform"
    }

    fn priority(&self) -> u32 {
        33
    }

    fn hook_patterns(&self) -> &[&'static str] {
        HOOK_PATTERNS
    }

    fn can_handle(&self, command: &str) -> bool {
        COMMAND_RE.is_match(command.trim())
    }

    fn process(&self, _command: &str, output: &str) -> String {
        if output.trim().is_empty() || output.lines().count() <= MAX_UNCHANGED {
            return output.to_string();
        }

        let mut result: Vec<&str> = Vec::new();
        let mut in_resource = false;
        let mut action = Action::Unknown;

        for line in output.lines() {
            let stripped = line.trim();

            if INIT_NOISE_RE.is_match(stripped) {
                continue;
            }

            if RESOURCE_HEADER_RE.is_match(stripped) {
                in_resource = true;
                action = Action::from_header(stripped);
                result.push(line);
                continue;
            }

            if in_resource {
                if RESOURCE_OPEN_RE.is_match(stripped) || stripped == "}" {
                    in_resource = stripped != "}";
                    result.push(line);
                } else if Self::keep_attribute(stripped, action) {
                    result.push(line);
                }
                continue;
            }

            let keep = SUMMARY_RE.is_match(stripped)
                || OUTPUT_VALUE_RE.is_match(stripped)
                || DIAGNOSTIC_RE.is_match(stripped);
            if keep {
                result.push(line);
                continue;
            }

            // One blank line between kept sections
            if stripped.is_empty() && result.last().is_some_and(|prev| !prev.trim().is_empty()) {
                result.push(line);
            }
        }

        if result.iter().all(|line| line.trim().is_empty()) {
            return output.to_string();
        }
        result.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> String {
        let lines = vec![
            "Initializing the backend...",
            "Initializing provider plugins...",
            "- Installed hashicorp/aws v5.0.0 (signed by HashiCorp)",
            "",
            "Terraform will perform the following actions:",
            "",
            "  # aws_instance.web will be updated in-place",
            "  ~ resource \"aws_instance\" \"web\" {",
            "        id            = \"i-0abc\"",
            "        ami           = \"ami-123\"",
            "      ~ instance_type = \"t2.micro\" -> \"t3.micro\"",
            "        tags          = {}",
            "    }",
            "",
            "  # aws_s3_bucket.logs will be created",
            "  + resource \"aws_s3_bucket\" \"logs\" {",
            "      + bucket = \"my-logs\"",
            "      + arn    = (known after apply)",
            "    }",
            "",
            "  # aws_iam_role.old will be destroyed",
            "  - resource \"aws_iam_role\" \"old\" {",
            "      - name = \"old-role\" -> null",
            "        path = \"/\"",
            "    }",
            "",
        ];
        let filler: Vec<String> = (0..10)
            .map(|i| format!("        unchanged_{} = \"value\"", i))
            .collect();
        let mut owned: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        owned.splice(9..9, filler);
        owned.push("Warning: Argument is deprecated".to_string());
        owned.push(String::new());
        owned.push("Plan: 1 to add, 1 to change, 1 to destroy.".to_string());
        owned.join("\n")
    }

    #[test]
    fn test_can_handle() {
        let p = TerraformProcessor::new();
        assert!(p.can_handle("terraform plan"));
        assert!(p.can_handle("tofu apply -auto-approve"));
        assert!(!p.can_handle("terraform init"));
        assert!(!p.can_handle("echo terraform plan"));
    }

    #[test]
    fn test_plan_compressed() {
        let output = plan();
        let result = TerraformProcessor::new().process("terraform plan", &output);

        assert!(!result.contains("Initializing"));
        assert!(!result.contains("Installed hashicorp"));
        assert!(!result.contains("unchanged_3"));
        assert!(!result.contains("ami-123"));
        assert!(result.contains("# aws_instance.web will be updated in-place"));
        assert!(result.contains("~ instance_type = \"t2.micro\" -> \"t3.micro\""));
        assert!(result.contains("+ bucket = \"my-logs\""));
        assert!(result.contains("+ arn    = (known after apply)"));
        assert!(result.contains("- name = \"old-role\" -> null"));
        assert!(!result.contains("path = \"/\""));
        assert!(result.contains("Warning: Argument is deprecated"));
        assert!(result.ends_with("Plan: 1 to add, 1 to change, 1 to destroy."));
        assert!(result.len() < output.len());
    }

    #[test]
    fn test_second_pass_keeps_markers() {
        let mut output = plan();
        for i in 0..10 {
            output.push_str(&format!(
                "\n\n  # aws_route53_record.r{} will be updated in-place\n  ~ resource \"aws_route53_record\" \"r{}\" {{\n        zone_id = \"Z1\"\n      ~ ttl     = 60 -> 300\n    }}",
                i, i
            ));
        }
        output.push_str("\n\nPlan: 1 to add, 11 to change, 1 to destroy.");

        let p = TerraformProcessor::new();
        let once = p.process("terraform plan", &output);
        let twice = p.process("terraform plan", &once);
        assert!(once.lines().count() > MAX_UNCHANGED);
        for marker in [
            "# aws_instance.web will be updated in-place",
            "~ instance_type = \"t2.micro\" -> \"t3.micro\"",
            "+ arn    = (known after apply)",
            "# aws_route53_record.r9 will be updated in-place",
            "~ ttl     = 60 -> 300",
            "Warning: Argument is deprecated",
            "Plan: 1 to add, 11 to change, 1 to destroy.",
        ] {
            assert!(once.contains(marker), "first pass lost {}", marker);
            assert!(twice.contains(marker), "second pass lost {}", marker);
        }
        assert!(!twice.contains("zone_id"));
    }

    #[test]
    fn test_short_plan_unchanged() {
        let output = "No changes. Your infrastructure matches the configuration.";
        assert_eq!(
            TerraformProcessor::new().process("terraform plan", output),
            output
        );
    }

    #[test]
    fn test_empty_output_unchanged() {
        assert_eq!(TerraformProcessor::new().process("terraform apply", ""), "");
    }
}
