use serde::Serialize;

pub const PRODUCT_NAME: &str = "Vocably";
pub const MAX_TEXT_LENGTH: usize = 3000;
pub const WARNING_THRESHOLD: usize = 2700;
pub const DEFAULT_VOICE: &str = "Vivian";
pub const DEFAULT_LANGUAGE: &str = "Auto";
pub const DEFAULT_TEXT: &str = "Welcome to Vocably. Experience natural-sounding voice synthesis powered by Qwen3-TTS. Type your text here and hit play to hear it instantly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Standard,
    Premium,
}

impl Engine {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "neural" => Some(Engine::Standard),
            "premium" | "generative" => Some(Engine::Premium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Voice {
    pub name: &'static str,
    pub voice_id: &'static str,
    pub label: &'static str,
    pub engines: &'static [Engine],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TonePreset {
    pub id: &'static str,
    pub label: &'static str,
    pub instruction: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Example {
    pub id: &'static str,
    pub label: &'static str,
    pub text: &'static str,
}

const BOTH_ENGINES: &[Engine] = &[Engine::Standard, Engine::Premium];

macro_rules! voice {
    ($name:literal, $id:literal) => {
        Voice {
            name: $name,
            voice_id: $id,
            label: $name,
            engines: BOTH_ENGINES,
        }
    };
}

/// Speakers offered by the CustomVoice models.
pub const VOICES: &[Voice] = &[
    voice!("Vivian", "vivian"),
    voice!("Ryan", "ryan"),
    voice!("Elena", "elena"),
    voice!("Lucas", "lucas"),
    voice!("Isabella", "isabella"),
    voice!("Marcus", "marcus"),
    voice!("Aria", "aria"),
    voice!("Daniel", "daniel"),
    voice!("Sophie", "sophie"),
    voice!("Nathan", "nathan"),
];

pub const TONE_PRESETS: &[TonePreset] = &[
    TonePreset {
        id: "none",
        label: "Default",
        instruction: "",
    },
    TonePreset {
        id: "excited",
        label: "Excited",
        instruction: "Speak with excitement and enthusiasm",
    },
    TonePreset {
        id: "sad",
        label: "Sad",
        instruction: "Speak in a sad, melancholic tone",
    },
    TonePreset {
        id: "angry",
        label: "Angry",
        instruction: "Speak with anger and frustration",
    },
    TonePreset {
        id: "whisper",
        label: "Whisper",
        instruction: "Whisper softly and quietly",
    },
    TonePreset {
        id: "news",
        label: "News",
        instruction: "Speak like a professional news anchor",
    },
    TonePreset {
        id: "calm",
        label: "Calm",
        instruction: "Speak slowly, calmly, and peacefully",
    },
    TonePreset {
        id: "dramatic",
        label: "Dramatic",
        instruction: "Speak with dramatic flair and intensity",
    },
];

pub const EXAMPLES: &[Example] = &[
    Example {
        id: "meta",
        label: "Self-Aware",
        text: "I know what you're thinking: 'This is just a computer.' But listen closely to the pauses, the breath, and the rhythm. I'm not just reading text; I'm telling a story. Go ahead, clear this box and give me something challenging to say.",
    },
    Example {
        id: "storyteller",
        label: "Storyteller",
        text: "The old lighthouse stood defiant against the crashing waves, a solitary beacon in the endless grey. Close your eyes and listen. Can you see the storm? That is the power of a perfect voice—it doesn't just read words; it paints pictures.",
    },
    Example {
        id: "creator",
        label: "Creator",
        text: "Stop wasting hours staring at a microphone. Whether you're explaining quantum physics or reviewing the latest tech, I can narrate your script in seconds with zero mistakes. Ready to create your next viral video? Type your script here.",
    },
    Example {
        id: "conversational",
        label: "Friendly",
        text: "Hello there. I promise I haven't had any coffee today, but I still sound this energetic. I can be your news anchor, your storyteller, or the voice of your brand. Type something funny, or maybe something serious—I can handle both.",
    },
    Example {
        id: "fact",
        label: "Fact Hook",
        text: "Did you know the human ear can detect sound in less than 0.05 seconds? That's faster than you can blink. You need a voice that makes an instant impact. Type your message here and let's see if we can capture your audience's attention just as fast.",
    },
];

pub fn find_voice(name: &str) -> Option<&'static Voice> {
    let name = name.trim();
    VOICES
        .iter()
        .find(|v| v.name.eq_ignore_ascii_case(name) || v.voice_id.eq_ignore_ascii_case(name))
}

/// Looks a tone up by id or by label.
pub fn find_tone(id: &str) -> Option<&'static TonePreset> {
    let id = id.trim();
    TONE_PRESETS
        .iter()
        .find(|t| t.id.eq_ignore_ascii_case(id) || t.label.eq_ignore_ascii_case(id))
}

/// Reverse lookup used when displaying the current instruction.
pub fn tone_for_instruction(instruction: &str) -> Option<&'static TonePreset> {
    TONE_PRESETS
        .iter()
        .find(|t| t.instruction == instruction.trim())
}

pub fn find_example(id: &str) -> Option<&'static Example> {
    let id = id.trim();
    EXAMPLES
        .iter()
        .find(|e| e.id.eq_ignore_ascii_case(id) || e.label.eq_ignore_ascii_case(id))
}

pub fn voices_for_engine(engine: Engine) -> impl Iterator<Item = &'static Voice> {
    VOICES.iter().filter(move |v| v.engines.contains(&engine))
}

/// Cuts `text` down to at most `MAX_TEXT_LENGTH` characters.
pub fn clamp_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_LENGTH) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCounter {
    pub chars: usize,
    pub max: usize,
    pub over_warning: bool,
}

impl TextCounter {
    pub fn for_text(text: &str) -> Self {
        let chars = text.chars().count();
        Self {
            chars,
            max: MAX_TEXT_LENGTH,
            over_warning: chars > WARNING_THRESHOLD,
        }
    }
}

impl std::fmt::Display for TextCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.chars, self.max)
    }
}
