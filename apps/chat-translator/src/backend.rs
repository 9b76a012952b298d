use lingo_dispatch::{EngineError, EngineOutput, ModelTier, TranslationEngine};
use std::collections::HashMap;

/// Word-substitution engine backing the worker pool in this deployment.
///
/// Real model backends (NLLB-class seq2seq models) plug in behind the same
/// `TranslationEngine` trait; this one keeps the service self-contained and
/// deterministic. It behaves like the real thing where it matters: it is
/// blocking, per-instance stateful, and must only ever run under its tier's
/// lock.
pub struct LexiconEngine {
	name: String,
	pairs: HashMap<(&'static str, &'static str), HashMap<&'static str, &'static str>>,
	markers: HashMap<&'static str, Vec<&'static str>>,
}

impl LexiconEngine {
	#[must_use]
	pub fn new(tier: ModelTier) -> Self {
		Self {
			name: format!("lexicon-{tier}"),
			pairs: build_pairs(),
			markers: build_markers(),
		}
	}
}

impl TranslationEngine for LexiconEngine {
	fn model_name(&self) -> &str {
		&self.name
	}

	fn detect_language(&self, text: &str) -> Option<String> {
		let words: Vec<String> = text.split_whitespace().map(normalize).collect();

		let mut best: Option<(&str, usize)> = None;
		for (language, marker_words) in &self.markers {
			let hits = words.iter().filter(|word| marker_words.contains(&word.as_str())).count();
			if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
				best = Some((language, hits));
			}
		}

		best.map(|(language, _)| language.to_owned())
	}

	fn translate_batch(&self, segments: &[String], source: Option<&str>, target: &str) -> Result<Vec<EngineOutput>, EngineError> {
		segments
			.iter()
			.map(|segment| {
				let resolved = source
					.map(str::to_owned)
					.or_else(|| self.detect_language(segment))
					.unwrap_or_else(|| "und".to_owned());
				Ok(self.translate_segment(segment, &resolved, target))
			})
			.collect()
	}
}

impl LexiconEngine {
	fn translate_segment(&self, text: &str, source: &str, target: &str) -> EngineOutput {
		let Some(vocabulary) = self.pairs.get(&(table_key(source), table_key(target))) else {
			// Unknown pair: pass the text through at low confidence rather
			// than failing the whole batch
			return EngineOutput {
				translated_text: text.to_owned(),
				detected_source: source.to_owned(),
				confidence: 0.2,
			};
		};

		let mut translated_words = Vec::new();
		let mut hits = 0usize;
		let mut total = 0usize;
		for word in text.split_whitespace() {
			total += 1;
			let normalized = normalize(word);
			if let Some(replacement) = vocabulary.get(normalized.as_str()) {
				hits += 1;
				translated_words.push((*replacement).to_owned());
			} else {
				translated_words.push(word.to_owned());
			}
		}

		let coverage = if total == 0 { 0.0 } else { hits as f32 / total as f32 };

		EngineOutput {
			translated_text: translated_words.join(" "),
			detected_source: source.to_owned(),
			confidence: (0.3 + 0.6 * coverage).min(0.9),
		}
	}
}

fn normalize(word: &str) -> String {
	word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Maps a runtime language code onto the static keys of the lexicon tables.
fn table_key(code: &str) -> &'static str {
	match code {
		"en" => "en",
		"fr" => "fr",
		"es" => "es",
		_ => "und",
	}
}

fn build_pairs() -> HashMap<(&'static str, &'static str), HashMap<&'static str, &'static str>> {
	let mut pairs = HashMap::new();

	pairs.insert(
		("en", "fr"),
		HashMap::from([
			("hello", "bonjour"),
			("goodbye", "au revoir"),
			("thanks", "merci"),
			("thank", "merci"),
			("please", "s'il vous plaît"),
			("yes", "oui"),
			("no", "non"),
			("friend", "ami"),
			("friends", "amis"),
			("good", "bon"),
			("morning", "matin"),
			("world", "monde"),
			("how", "comment"),
			("are", "êtes"),
			("you", "vous"),
		]),
	);

	pairs.insert(
		("fr", "en"),
		HashMap::from([
			("bonjour", "hello"),
			("merci", "thanks"),
			("oui", "yes"),
			("non", "no"),
			("ami", "friend"),
			("amis", "friends"),
			("bon", "good"),
			("matin", "morning"),
			("monde", "world"),
			("comment", "how"),
			("vous", "you"),
		]),
	);

	pairs.insert(
		("en", "es"),
		HashMap::from([
			("hello", "hola"),
			("goodbye", "adiós"),
			("thanks", "gracias"),
			("please", "por favor"),
			("yes", "sí"),
			("no", "no"),
			("friend", "amigo"),
			("friends", "amigos"),
			("good", "buenos"),
			("morning", "días"),
			("world", "mundo"),
		]),
	);

	pairs.insert(
		("es", "en"),
		HashMap::from([
			("hola", "hello"),
			("gracias", "thanks"),
			("sí", "yes"),
			("amigo", "friend"),
			("amigos", "friends"),
			("mundo", "world"),
		]),
	);

	pairs
}

fn build_markers() -> HashMap<&'static str, Vec<&'static str>> {
	HashMap::from([
		("en", vec!["the", "is", "and", "you", "hello", "thanks", "good", "morning", "how", "are"]),
		("fr", vec!["le", "la", "est", "et", "bonjour", "merci", "oui", "vous", "comment"]),
		("es", vec!["el", "la", "es", "y", "hola", "gracias", "sí", "buenos", "días"]),
	])
}
