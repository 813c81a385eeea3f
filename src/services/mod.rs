mod summarizer;
mod telegram;

pub use summarizer::LinkSummarizer;
pub use telegram::TelegramClient;
