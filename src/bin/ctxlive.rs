//! Demonstration driver. Runs the interprocedural liveness analysis over a
//! small synthetic program and prints, for each block, which variables are
//! live on entry.
//!
//! This binary is demonstration glue only: it is not part of the library's
//! contract, and exists to give a hand-buildable, CFG-free way to exercise
//! `FixpointDriver` without a real disassembler or binary loader on hand.

use clap::Parser;

use ctxlive::back::AnalysisResult;
use ctxlive::common::Addr;
use ctxlive::front::arch::Arch;
use ctxlive::front::cfg::{Cfg, CfgNode};
use ctxlive::front::ir::{Block, Endian, Expr, IrType, Jumpkind, Stmt};
use ctxlive::middle::fixpoint::FixpointDriver;

#[derive(Debug, Parser)]
#[command(version, about = "context-sensitive interprocedural live-variables demo", long_about = None)]
struct Args {
    /// Abort on the first block that fails to lift, instead of skipping it.
    #[arg(long, default_value_t = false)]
    fail_fast: bool,
    /// Enable debug logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug)]
struct DemoArch;

impl Arch for DemoArch {
    fn sp_offset(&self) -> i64 {
        48
    }
    fn bp_offset(&self) -> i64 {
        56
    }
    fn ip_offset(&self) -> i64 {
        64
    }
    fn translate_register_name(&self, offset: i64, _size: u32) -> String {
        match offset {
            16 => "rax".to_string(),
            24 => "rbx".to_string(),
            32 => "rcx".to_string(),
            other => format!("r{other}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DemoNode {
    block: Block,
    function_address: Addr,
    has_return: bool,
}

impl CfgNode for DemoNode {
    fn addr(&self) -> Addr {
        self.block.addr
    }
    fn function_address(&self) -> Addr {
        self.function_address
    }
    fn is_simprocedure(&self) -> bool {
        false
    }
    fn has_return(&self) -> bool {
        self.has_return
    }
    fn block(&self) -> AnalysisResult<Block> {
        Ok(self.block.clone())
    }
    fn instruction_addrs(&self) -> Vec<Addr> {
        self.block.statements.iter().filter_map(|s| match s {
            Stmt::IMark { addr, .. } => Some(*addr),
            _ => None,
        }).collect()
    }
}

struct DemoCfg {
    nodes: Vec<DemoNode>,
    edges: Vec<(Addr, Addr, Jumpkind)>,
}

impl Cfg for DemoCfg {
    type Node = DemoNode;

    fn nodes(&self) -> Vec<DemoNode> {
        self.nodes.clone()
    }

    fn successors(&self, node: &DemoNode, jumpkind: Option<&Jumpkind>) -> Vec<DemoNode> {
        self.edges
            .iter()
            .filter(|(from, _, jk)| *from == node.addr() && jumpkind.map_or(true, |want| jk == want))
            .filter_map(|(_, to, _)| self.nodes.iter().find(|n| n.addr() == *to).cloned())
            .collect()
    }

    fn predecessors(&self, node: &DemoNode, jumpkind: Option<&Jumpkind>) -> Vec<DemoNode> {
        self.edges
            .iter()
            .filter(|(_, to, jk)| *to == node.addr() && jumpkind.map_or(true, |want| jk == want))
            .filter_map(|(from, _, _)| self.nodes.iter().find(|n| n.addr() == *from).cloned())
            .collect()
    }

    fn successors_and_jumpkind(&self, node: &DemoNode) -> Vec<(DemoNode, Jumpkind)> {
        self.edges
            .iter()
            .filter(|(from, _, _)| *from == node.addr())
            .filter_map(|(_, to, jk)| {
                self.nodes.iter().find(|n| n.addr() == *to).map(|n| (n.clone(), jk.clone()))
            })
            .collect()
    }
}

/// A two-function program: `main` calls `callee`, which writes `rax` and
/// returns; `main` then performs an indirect jump through `rbx`.
fn demo_program() -> DemoCfg {
    let callee_entry = DemoNode {
        block: Block {
            addr: 0x2000,
            statements: vec![
                Stmt::IMark { addr: 0x2000, len: 4, delta: 0 },
                Stmt::Put { offset: 16, data: Expr::const_u64(1) },
            ],
            next: Expr::const_u64(0x2004),
            jumpkind: Jumpkind::Ret,
        },
        function_address: 0x2000,
        has_return: true,
    };

    let main_entry = DemoNode {
        block: Block {
            addr: 0x1000,
            statements: vec![Stmt::IMark { addr: 0x1000, len: 5, delta: 0 }],
            next: Expr::const_u64(0x2000),
            jumpkind: Jumpkind::Call,
        },
        function_address: 0x1000,
        has_return: false,
    };

    let main_after_call = DemoNode {
        block: Block {
            addr: 0x1005,
            statements: vec![
                Stmt::IMark { addr: 0x1005, len: 6, delta: 0 },
                Stmt::Store {
                    addr: Expr::get(48, IrType::I64),
                    data: Expr::get(16, IrType::I64),
                    end: Endian::Little,
                },
            ],
            next: Expr::get(24, IrType::I64),
            jumpkind: Jumpkind::Boring,
        },
        function_address: 0x1000,
        has_return: true,
    };

    DemoCfg {
        nodes: vec![callee_entry.clone(), main_entry.clone(), main_after_call.clone()],
        edges: vec![
            (0x1000, 0x2000, Jumpkind::Call),
            (0x1000, 0x1005, Jumpkind::FakeRet),
        ],
    }
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let cfg = demo_program();
    let arch = DemoArch;
    let driver = FixpointDriver::new(&cfg, &arch, args.fail_fast);

    match driver.run() {
        Ok(results) => {
            for fn_addr in [0x1000u64, 0x2000u64] {
                println!("function 0x{fn_addr:x}:");
                for block_result in results.results_for_function(fn_addr) {
                    let uses: Vec<String> = block_result
                        .state
                        .unqualified_uses()
                        .into_iter()
                        .map(|u| u.var.human_name(&arch))
                        .collect();
                    println!("  block 0x{:x}: live-in = {{{}}}", block_result.addr(), uses.join(", "));
                }
            }

            if !results.diagnostics.is_empty() {
                eprintln!("diagnostics:");
                for d in &results.diagnostics {
                    eprintln!("  {d}");
                }
            }
        }
        Err(e) => {
            eprintln!("analysis failed: {e}");
            std::process::exit(1);
        }
    }
}
