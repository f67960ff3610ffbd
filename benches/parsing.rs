use criterion::{black_box, criterion_group, criterion_main, Criterion};
use morphoparse::lm::trie::Trie;
use morphoparse::parse::Parse;

fn bench_parse_codec(c: &mut Criterion) {
    let codec = Parse::new('\u{2980}', vec!['-', '=']);
    let parse = "tombe\u{2980}fall\u{2980}V-ait\u{2980}3SG.IMPV\u{2980}AGR=s\u{2980}PL\u{2980}AGR";

    c.bench_function("parse_to_triple", |b| {
        b.iter(|| codec.parse_to_triple(black_box(parse)).unwrap())
    });

    c.bench_function("morphemes", |b| {
        b.iter(|| codec.morphemes(black_box(parse)).unwrap())
    });
}

fn bench_trie_score(c: &mut Criterion) {
    let arpa = "\\data\\\nngram 1=4\nngram 2=2\n\n\\1-grams:\n-1.0\t<s>\t-0.3\n-1.0\t</s>\n-0.5\tfall\t-0.2\n-2.0\tdog\n\n\\2-grams:\n-0.1\t<s>\tfall\n-0.2\tfall\t</s>\n\n\\end\\\n";
    let trie = Trie::parse_arpa(arpa).unwrap();
    let sequence: Vec<String> = vec!["<s>".to_string(), "fall".to_string(), "</s>".to_string()];

    c.bench_function("trie_score", |b| {
        b.iter(|| trie.score(black_box(&sequence)))
    });
}

criterion_group!(benches, bench_parse_codec, bench_trie_score);
criterion_main!(benches);
