use mpcvote::*;
use rand::Rng;

pub fn command_demo(matches: &clap::ArgMatches) {
    let voters: usize = crate::parse_arg(matches, "voters", "demo").unwrap_or(10);

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("mpcvote demo: {}", e);
        std::process::exit(1);
    });
    if let Some(authorities) = crate::parse_arg(matches, "authorities", "demo") {
        config.num_authorities = authorities;
    }
    let admin_secret = config.admin_secret.clone();
    let authorities = config.num_authorities;

    let election = Election::new(config).unwrap_or_else(|e| {
        eprintln!("mpcvote demo: {}", e);
        std::process::exit(1);
    });

    let mut rng = rand::rngs::OsRng {};
    let mut expected = 0;
    for i in 0..voters {
        let voter_id = format!("voter-{}", i + 1);
        let vote: u64 = rng.gen_range(0, 2);
        expected += vote;

        let issued = election.issue_token(&voter_id);
        let submission = match Ballot::prepare(&mut rng, vote, authorities) {
            Ok(ballot) => ballot.into_submission(&issued.token, &voter_id),
            Err(e) => {
                eprintln!("mpcvote demo: {}", e);
                std::process::exit(1);
            }
        };

        if let Err(e) = election.submit_vote(submission) {
            eprintln!("mpcvote demo: {} rejected: {} ({})", voter_id, e, e.kind());
            std::process::exit(1);
        }
    }

    let tally = match election.compute_tally(&admin_secret) {
        Ok(tally) => tally,
        Err(e) => {
            eprintln!("mpcvote demo: {}", e);
            std::process::exit(1);
        }
    };

    println!("> {} voters, {} authorities", voters, authorities);
    for (i, sum) in tally.local_sums.iter().enumerate() {
        println!("  authority {}: local sum {}", i, sum);
    }
    println!("> Total: {} (expected {})", tally.total, expected);

    if let Some(path) = matches.value_of("out") {
        let snapshot = election.board_snapshot();
        let bytes = if path.ends_with(".cbor") {
            snapshot.to_cbor()
        } else {
            snapshot.to_json().map(String::into_bytes)
        };
        let bytes = bytes.unwrap_or_else(|e| {
            eprintln!("mpcvote demo: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = std::fs::write(path, bytes) {
            eprintln!("mpcvote demo: unable to write {}: {}", path, e);
            std::process::exit(1);
        }
        println!("> Bulletin board written to {}", path);
    }

    if tally.total != expected {
        std::process::exit(1);
    }
}
