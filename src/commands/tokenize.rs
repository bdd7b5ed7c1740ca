use anyhow::Result;
use tracing::info;

use crate::cli::TokenizeArgs;
use crate::lexical::{LexicalTokenizer, TokenizerConfig};
use crate::model::{QuestionRecord, TokenizedQuestion};
use crate::util::{read_json, write_json_pretty};

pub fn run(args: TokenizeArgs) -> Result<()> {
    let config = match args.stopwords_path.as_deref() {
        Some(path) => TokenizerConfig::from_stopword_file(path)?,
        None => TokenizerConfig::default(),
    };
    let stopwords = config.stopword_count();
    let tokenizer = LexicalTokenizer::new(config);

    let questions: Vec<QuestionRecord> = read_json(&args.questions)?;
    let tokenized = questions
        .into_iter()
        .map(|record| TokenizedQuestion {
            tokens: tokenizer.tokenize(&record.question),
            qid: record.qid,
        })
        .collect::<Vec<TokenizedQuestion>>();

    let empty = tokenized.iter().filter(|record| record.tokens.is_empty()).count();
    write_json_pretty(&args.output, &tokenized)?;

    info!(
        questions = tokenized.len(),
        empty_questions = empty,
        stopwords,
        output = %args.output.display(),
        "tokenized questions"
    );
    Ok(())
}
