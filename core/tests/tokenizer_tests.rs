use retrieval::tokenizer::{boolean_tokens, tokenize};

#[test]
fn it_lowercases_and_splits_on_non_word_runs() {
    let words = tokenize("Running--Runners RUN! The café's menu.");
    assert_eq!(words, vec!["running", "runners", "run", "the", "café", "s", "menu"]);
}

#[test]
fn it_keeps_stopwords_and_digits() {
    let words = tokenize("the 2 cats and_dogs");
    assert_eq!(words, vec!["the", "2", "cats", "and_dogs"]);
}

#[test]
fn boolean_tokens_split_glued_parentheses() {
    assert_eq!(boolean_tokens("NOT(a)"), vec!["not", "(", "a", ")"]);
}
