use mpcvote::Ballot;

pub fn command_split(matches: &clap::ArgMatches) {
    let vote: u64 = crate::parse_arg(matches, "VOTE", "split").unwrap_or(0);
    let authorities: usize = crate::parse_arg(matches, "authorities", "split").unwrap_or(3);

    let mut rng = rand::rngs::OsRng {};
    let ballot = match Ballot::prepare(&mut rng, vote, authorities) {
        Ok(ballot) => ballot,
        Err(e) => {
            eprintln!("mpcvote split: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&ballot) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("mpcvote split: {}", e);
            std::process::exit(1);
        }
    }
}
