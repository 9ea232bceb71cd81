use super::*;

fn state(base: &str) -> AppState {
    AppState::new(UploadStore::at(std::env::temp_dir()), base.to_owned())
}

#[test]
fn retrieval_url_embeds_generated_name_and_original() {
    let s = state("http://10.0.0.5:3001");
    assert_eq!(
        s.retrieval_url("0123abcd", "slides.pptx"),
        "http://10.0.0.5:3001/uploads/0123abcd?name=slides.pptx"
    );
}

#[test]
fn retrieval_url_encodes_original_name() {
    let s = state("http://localhost:3001/");
    assert_eq!(
        s.retrieval_url("ff", "Q3 plan & review.pptx"),
        "http://localhost:3001/uploads/ff?name=Q3%20plan%20%26%20review.pptx"
    );
}
