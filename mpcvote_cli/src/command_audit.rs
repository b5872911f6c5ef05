use mpcvote::BoardSnapshot;

pub fn command_audit(matches: &clap::ArgMatches) {
    let filename = match matches.value_of("BOARD") {
        Some(filename) => filename,
        None => {
            eprintln!("mpcvote audit: board filename required");
            std::process::exit(1);
        }
    };

    let file_bytes = match std::fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("mpcvote audit: unable to read {}: {}", filename, e);
            std::process::exit(1);
        }
    };

    let snapshot = match BoardSnapshot::from_bytes(&file_bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("mpcvote audit: unable to parse {}: {}", filename, e);
            std::process::exit(1);
        }
    };

    match snapshot.audit() {
        Ok(report) => {
            println!("> Bulletin board verified OK");
            println!("  tokens issued:     {}", report.tokens_issued);
            println!("  votes submitted:   {}", report.votes_submitted);
            println!("  tallies published: {}", report.tallies_published);
            if let Some(total) = report.last_total {
                println!("  last total:        {}", total);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
