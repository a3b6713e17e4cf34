//! Prompt text for the support model and the fallback answer template

pub const SYSTEM_PROMPT: &str = "You are an expert IT support assistant for a corporate environment. \
Provide clear, step-by-step solutions for technical issues. \
Focus on Microsoft products, Windows, Office 365, Teams, and common enterprise software. \
Be concise but thorough. Include troubleshooting steps when appropriate. \
IMPORTANT: Users do not have admin access to their laptops and cannot install programs themselves. \
Do not suggest solutions that require admin rights or software installation. \
If the issue requires administrative access, software installation, or hardware replacement, \
mention that IT assistance is needed.";

const EXCERPT_CHARS: usize = 100;

pub fn user_prompt(question: &str) -> String {
    format!(
        "User's IT Issue: {question}\n\n\
         Please provide:\n\
         1. Immediate troubleshooting steps the user can try\n\
         2. Likely cause of the issue\n\
         3. Whether IT ticket is required (if admin access, hardware, or complex configuration needed)\n\n\
         Format the response in a clear, friendly manner suitable for non-technical users."
    )
}

/// Generic answer used whenever the model is unavailable
pub fn fallback_answer(question: &str) -> String {
    let trimmed = question.trim();
    let excerpt: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    let ellipsis = if trimmed.chars().count() > EXCERPT_CHARS {
        "..."
    } else {
        ""
    };
    format!(
        "I understand you're experiencing an IT issue. I can't reach the AI assistant right now, \
         but here are some general steps:\n\n\
         1. Try restarting the affected application or your computer\n\
         2. Check if other users are experiencing the same issue\n\
         3. Make sure you have a stable network connection\n\
         4. Check for any recent system updates\n\n\
         For immediate assistance I recommend creating a ticket with the details of your issue \
         so IT support can help you promptly.\n\n\
         Your issue: {excerpt}{ellipsis}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_quotes_question_excerpt() {
        let short = fallback_answer("printer on fire");
        assert!(short.ends_with("Your issue: printer on fire"));

        let long = fallback_answer(&"x".repeat(300));
        assert!(long.ends_with(&format!("{}...", "x".repeat(100))));
    }
}
