use anyhow::Result;

fn main() -> Result<()> {
    cslice_cli::main_entry()
}
