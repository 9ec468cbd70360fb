//! Canned tutor replies, used when no language model is configured or reachable.

use lectern::types::ContextType;

const TOPICS: [(&str, &str); 6] = [
    (
        "javascript",
        "JavaScript is a versatile programming language used for web development. Would you like me to explain a specific concept like variables, functions, or asynchronous programming?",
    ),
    (
        "python",
        "Python is a beginner-friendly programming language great for data science, web development, and automation. What specific Python topic would you like to explore?",
    ),
    (
        "machine learning",
        "Machine learning involves training algorithms to recognize patterns in data. Key concepts include supervised learning, unsupervised learning, and neural networks. What aspect interests you most?",
    ),
    (
        "html",
        "HTML (HyperText Markup Language) is the backbone of web pages. It uses tags to structure content. Would you like to learn about specific HTML elements or best practices?",
    ),
    (
        "css",
        "CSS (Cascading Style Sheets) styles HTML elements. It controls layout, colors, fonts, and responsive design. What CSS topic would you like me to explain?",
    ),
    (
        "react",
        "React is a JavaScript library for building user interfaces with components. Key concepts include JSX, state, props, and hooks. What React feature would you like to understand better?",
    ),
];

/// Reply for an explicitly requested kind of help
pub fn context_reply(context: ContextType, message: &str) -> String {
    match context {
        ContextType::ExplainTopic => format!(
            "Let me break down this topic for you:\n\n**Key Points:**\n1. Understanding the fundamentals\n2. Practical applications\n3. Common use cases\n\nRegarding \"{message}\", I'd be happy to provide a detailed explanation. What specific aspect would you like me to focus on?"
        ),
        ContextType::PracticeQuestions => format!(
            "Here are some practice questions about \"{message}\":\n\n**Question 1:** Can you explain the main concept?\n**Question 2:** How would you apply this in a real project?\n**Question 3:** What are the key differences between similar concepts?\n\nTry answering these, and I'll provide feedback!"
        ),
        ContextType::CodeExamples => format!(
            "Here's a practical example related to \"{message}\":\n\n```javascript\n// Example implementation\nfunction exampleCode() {{\n    // This demonstrates the concept\n    console.log(\"Learning in action!\");\n}}\n```\n\nWould you like me to explain how this code works or show more examples?"
        ),
        ContextType::RealWorld => format!(
            "\"{message}\" has many real-world applications:\n\n🌍 **Industry Use Cases:**\n• Web development projects\n• Mobile applications\n• Data analysis\n• Automation systems\n\nWhich application area interests you most?"
        ),
        ContextType::StudyGuide => format!(
            "**Study Guide: {message}**\n\n📚 **Key Concepts to Master:**\n1. Fundamental principles\n2. Practical implementation\n3. Best practices\n4. Common pitfalls to avoid\n\n💡 **Study Tips:**\n• Practice with examples\n• Build small projects\n• Join study groups\n\nWhat topic should we focus on first?"
        ),
        ContextType::QuizPrep => format!(
            "**Quiz Preparation: {message}**\n\n🎯 **Focus Areas:**\n• Core concepts and definitions\n• Practical applications\n• Problem-solving strategies\n\n📝 **Study Strategy:**\n1. Review key concepts\n2. Practice with examples\n3. Take practice quizzes\n\nWhat specific area would you like help with?"
        ),
    }
}

/// Picks a reply by context type, then topic keyword, then question word, then greeting or help
/// request, falling back to a generic answer.
pub fn reply(message: &str, context: Option<ContextType>) -> String {
    if let Some(context) = context {
        return context_reply(context, message);
    }

    let lower = message.to_lowercase();
    if let Some((_, response)) = TOPICS.iter().find(|(topic, _)| lower.contains(topic)) {
        return response.to_string();
    }

    if lower.starts_with("what") {
        return format!(
            "That's a great \"what\" question! You're asking for a definition or explanation. Let me help you understand:\n\nBased on \"{message}\", I can provide you with a comprehensive explanation. The key is to break it down into understandable parts. Would you like me to start with the basics or dive into a specific aspect?"
        );
    }
    if lower.starts_with("how") {
        return format!(
            "Excellent \"how\" question! You're looking for a process or method. Here's how I can help:\n\n**Step-by-step approach:**\n1. Start with the basics\n2. Break down the process\n3. Practice with examples\n4. Apply to real situations\n\nRegarding \"{message}\", which step would you like me to explain first?"
        );
    }
    if lower.starts_with("why") {
        return format!(
            "Great \"why\" question! You're seeking to understand the reasoning behind concepts. Understanding the \"why\" is crucial for deep learning.\n\n**Let me explain the reasoning:**\n• Historical context\n• Problem it solves\n• Benefits and advantages\n• Real-world importance\n\nFor \"{message}\", what specific aspect of the \"why\" interests you most?"
        );
    }

    // substring matches, so "this" counts as a greeting
    if ["hello", "hi", "hey"].iter().any(|w| lower.contains(w)) {
        return "Hello! 👋 I'm excited to help you learn today!\n\n**I can help you with:**\n🎓 Subject explanations\n📝 Practice questions\n💻 Code examples\n🌍 Real-world applications\n📚 Study guides\n🎯 Exam preparation\n\nWhat would you like to explore?".to_string();
    }
    if ["help", "assist", "support"].iter().any(|w| lower.contains(w)) {
        return "I'm here to help! 🤝\n\n**Ways I can assist you:**\n• Explain complex concepts simply\n• Provide step-by-step guidance\n• Generate practice exercises\n• Show practical examples\n• Create study materials\n\nWhat specific topic or subject would you like help with today?".to_string();
    }

    format!(
        "I understand you're asking about \"{message}\". As your AI tutor, I'm here to help you learn effectively!\n\n**Let me help by:**\n• Breaking down complex topics\n• Providing clear explanations\n• Offering practical examples\n• Suggesting study strategies\n\nCould you tell me more about what specific aspect you'd like to focus on? This will help me provide the most helpful response for your learning goals."
    )
}

#[test]
fn test_reply_selection() {
    // context type wins over topic keywords
    let r = reply("python lists", Some(ContextType::StudyGuide));
    assert!(r.starts_with("**Study Guide: python lists**"));

    assert!(reply("Tell me about React hooks", None).starts_with("React is a JavaScript library"));
    // "javascript" is checked before "react"
    assert!(reply("javascript and react", None).starts_with("JavaScript is"));
    assert!(reply("What is a closure?", None).contains("\"what\" question"));
    assert!(reply("how do loops work", None).contains("\"how\" question"));
    assert!(reply("Why recursion?", None).contains("\"why\" question"));
    assert!(reply("hey there", None).starts_with("Hello! 👋"));
    assert!(reply("can you assist me", None).starts_with("I'm here to help!"));
    assert!(reply("gradient descent", None).contains("\"gradient descent\""));
}

#[test]
fn test_context_replies() {
    for context in ContextType::ALL {
        let r = context_reply(context, "ownership");
        assert!(r.contains("ownership"), "{context}: {r}");
    }
    assert!(context_reply(ContextType::CodeExamples, "x").contains("function exampleCode() {"));
}
