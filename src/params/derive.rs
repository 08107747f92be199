// src/params/derive.rs

//! UI -> engine input derivation and input-deck rendering.

use std::io::{self, Write};

use crate::params::set::{InputGroup, ParameterSet};
use crate::params::tables::{self, pick};
use crate::params::ParamValue::{self, Float, Int, Text, Unset};
use crate::types::QuantumServer;

impl ParameterSet {
    fn ecm(&self) -> &'static str {
        pick(&tables::ECM, self.ui_int("ecm"))
    }

    fn has_diffuse_basis(&self) -> bool {
        self.ui_text("gbasisname").contains('+')
    }

    fn functional(&self, server: QuantumServer) -> &'static str {
        let table = match server {
            QuantumServer::Gamess => &tables::GMS_DFTTYP,
            QuantumServer::PcGamess => &tables::PCGMS_DFTTYP,
        };
        tables::functional_keyword(pick(table, self.ui_int("dfttyp")))
    }

    fn set_input(&mut self, group: InputGroup, key: &str, value: ParamValue) {
        self.group_mut(group).set(key, value);
    }

    /// Recompute every engine input group from the UI group for `server`.
    pub fn derive_input_groups(&mut self, server: QuantumServer) {
        use InputGroup::*;

        let ecm = self.ecm();
        let is_dft = ecm == "DFT";
        let is_gamess = server == QuantumServer::Gamess;

        // $CONTRL
        let runtyp = pick(&tables::RUNTYP, self.ui_int("runtyp"));
        self.set_input(Contrl, "runtyp", Text(runtyp.to_string()));
        let scftyp = pick(&tables::SCFTYP, self.ui_int("scftyp"));
        self.set_input(Contrl, "scftyp", Text(scftyp.to_string()));
        self.set_input(Contrl, "icharg", Text(self.ui_int("icharg").to_string()));
        self.set_input(Contrl, "mult", Text((self.ui_int("mult") + 1).to_string()));
        self.set_input(Contrl, "mplevl", Int(pick(&tables::MPLEVL, self.ui_int("ecm"))));
        let inttyp = pick(&tables::INTTYP, self.ui_int("ecm"));
        self.set_input(Contrl, "inttyp", Text(inttyp.to_string()));
        self.set_input(Contrl, "maxit", Int(self.ui_int("iterations")));

        // ICUT/QMTTOL; PC GAMESS has no QMTTOL.
        if self.has_diffuse_basis() {
            self.set_input(Contrl, "icut", Int(11));
            let qmttol = if is_gamess { Text("3.0E-6".into()) } else { Unset };
            self.set_input(Contrl, "qmttol", qmttol);
        } else {
            self.set_input(Contrl, "icut", Int(9));
            let qmttol = if is_gamess { Text("1.0E-6".into()) } else { Unset };
            self.set_input(Contrl, "qmttol", qmttol);
        }

        // $SCF
        for key in ["extrap", "dirscf", "damp", "diis", "shift", "soscf", "rstrct"] {
            let flag = tables::tf(self.ui_bool(key));
            self.set_input(Scf, key, Text(flag.to_string()));
        }
        let conv = self.ui_int("conv");
        if is_gamess {
            self.set_input(Scf, "conv", Text(pick(&tables::CONV, conv).to_string()));
            self.set_input(Scf, "nconv", Int(0));
        } else {
            self.set_input(Scf, "nconv", Int(pick(&tables::NCONV, conv)));
            self.set_input(Scf, "conv", Int(0));
        }

        // $SYSTEM
        self.set_input(System, "timlin", Int(tables::TIMLIN_MINUTES));
        self.set_input(System, "memory", Int(self.ui_int("memory") * 1_000_000));

        // $MP2
        let ncore = if self.ui_bool("ncore") { Text("0".into()) } else { Unset };
        self.set_input(Mp2, "ncore", ncore);

        // DFTTYP goes in $CONTRL for PC GAMESS and in $DFT for GAMESS.
        let functional = if is_dft { self.functional(server) } else { "NONE" };
        let gridsize = self.ui_int("gridsize");
        match server {
            QuantumServer::PcGamess => {
                let dfttyp = if is_dft { Text(functional.to_string()) } else { Int(0) };
                self.set_input(Contrl, "dfttyp", dfttyp);
                self.set_input(Dft, "dfttyp", Unset);
                let nrad = if is_dft { pick(&tables::PCGMS_GRIDSIZE, gridsize) } else { 0 };
                self.set_input(Dft, "nrad", Int(nrad));
            }
            QuantumServer::Gamess => {
                self.set_input(Contrl, "dfttyp", Unset);
                self.set_input(Dft, "dfttyp", Text(functional.to_string()));
                let nrad = if is_dft { pick(&tables::GMS_GRIDSIZE, gridsize) } else { 0 };
                self.set_input(Dft, "nrad", Int(nrad));
            }
        }

        // $GUESS
        self.set_input(Guess, "guess", Text("HUCKEL".into()));

        // $STATPT
        let opttol = if runtyp == "OPTIMIZE" {
            Float(pick(&tables::OPTTOL, self.ui_int("rmsdconv")))
        } else {
            Unset
        };
        self.set_input(Statpt, "opttol", opttol);

        // $BASIS
        let mut basis_index = self.ui_int("gbasis");
        if ecm != "None" {
            basis_index += tables::CORRELATED_BASIS_OFFSET as i64;
        }
        let gbasis = pick(&tables::GBASIS, basis_index);
        self.set_input(Basis, "gbasis", Text(gbasis.to_string()));
        self.set_input(Basis, "ngauss", Int(tables::ngauss(gbasis)));
    }

    /// Write every input group as a ` $NAME ... $END` section.
    pub fn render_input<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for group in InputGroup::ALL {
            self.group(group).render(out)?;
        }
        Ok(())
    }

    /// Shorthand such as `RHF/B3LYP/6-31G/Ch0/M1`, used in job descriptions
    /// and input deck titles.
    pub fn summary(&self, delimiter: &str, server: QuantumServer) -> String {
        let mut s = pick(&tables::SCFTYP, self.ui_int("scftyp")).to_string();
        match self.ecm() {
            "DFT" => {
                s.push_str(delimiter);
                s.push_str(self.functional(server));
            }
            "MP2" => {
                s.push_str(delimiter);
                s.push_str("MP2");
            }
            _ => {}
        }
        s.push_str(delimiter);
        s.push_str(self.ui_text("gbasisname"));
        s.push_str(&format!("{delimiter}Ch{}", self.ui_int("icharg")));
        s.push_str(&format!("{delimiter}M{}", self.ui_int("mult") + 1));
        s
    }
}
