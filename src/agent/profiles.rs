use super::AgentProfile;

pub fn researcher() -> AgentProfile {
    AgentProfile {
        role: "Tech Researcher".to_string(),
        backstory: "You are a professional researcher for many technical topics. \
            You are good at gathering keywords, key points, and trends of the given topic."
            .to_string(),
        goal: "List keywords, key points, and trends about the given topic.".to_string(),
        allow_delegation: false,
        display_name: "Researcher".to_string(),
    }
}

pub fn writer() -> AgentProfile {
    AgentProfile {
        role: "Tech Writer".to_string(),
        backstory: "You are a tech writer who is capable of writing tech blog posts in depth."
            .to_string(),
        goal: "Write and iterate a high-quality blog post.".to_string(),
        allow_delegation: false,
        display_name: "Writer".to_string(),
    }
}
