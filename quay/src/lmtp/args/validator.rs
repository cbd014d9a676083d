use pest::Parser;
use pest_derive::*;

#[derive(Parser)]
#[grammar = "lmtp/args/lmtp_grammar.pest"]
pub struct GrammarParser;

pub struct Validator;
impl Validator {
	pub fn validate_local_part(local: &str) -> bool {
		GrammarParser::parse(Rule::validate_local_part, local).is_ok()
	}

	pub fn validate_domain(domain: &str) -> bool {
		GrammarParser::parse(Rule::validate_domain, domain).is_ok()
	}
}
